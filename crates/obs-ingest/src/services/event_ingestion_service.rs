use obs_core::utils::{generate_id, now_timestamp};
use obs_core::Level;
use obs_entities::events;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, SqlErr};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

use super::types::{IngestError, NewEvent};

/// Service for validating and persisting incoming events
pub struct EventIngestionService {
    db: Arc<DatabaseConnection>,
}

impl EventIngestionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Validate a raw request body and store it. Returns the event id.
    pub async fn ingest(&self, body: &[u8]) -> Result<String, IngestError> {
        let event = parse_event(body)?;
        self.store_event(event).await
    }

    /// Insert one event. An id that is already stored is rejected and the
    /// existing row is left untouched.
    pub async fn store_event(&self, event: NewEvent) -> Result<String, IngestError> {
        let event_id = event.event_id.clone();

        let model = events::ActiveModel {
            id: Set(event.event_id),
            level: Set(event.level.as_str().to_string()),
            message: Set(event.message),
            stacktrace: Set(event.stacktrace),
            platform: Set(event.platform),
            timestamp: Set(event.timestamp),
            server_name: Set(event.server_name),
            environment: Set(event.environment),
            extra: Set(event.extra),
        };

        match model.insert(self.db.as_ref()).await {
            Ok(_) => {
                debug!("Stored event {}", event_id);
                Ok(event_id)
            }
            Err(e) => {
                if let Some(SqlErr::UniqueConstraintViolation(_)) = e.sql_err() {
                    debug!("Rejected duplicate event {}", event_id);
                    return Err(IngestError::DuplicateEvent);
                }
                error!("Failed to store event {}: {}", event_id, e);
                Err(IngestError::Storage(e))
            }
        }
    }
}

/// Parse and validate a request body, applying server-side defaults
pub fn parse_event(body: &[u8]) -> Result<NewEvent, IngestError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| IngestError::InvalidJson)?;
    let Value::Object(mut fields) = value else {
        return Err(IngestError::InvalidJson);
    };

    let message = match fields.remove("message") {
        Some(Value::String(message)) if !message.is_empty() => message,
        _ => return Err(IngestError::MissingMessage),
    };

    let event_id = take_string(&mut fields, "event_id")
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_id);

    let level = take_string(&mut fields, "level")
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or_default();

    let timestamp = take_string(&mut fields, "timestamp")
        .filter(|ts| !ts.is_empty())
        .unwrap_or_else(now_timestamp);

    Ok(NewEvent {
        event_id,
        level,
        message,
        stacktrace: take_json_text(&mut fields, "stacktrace"),
        platform: take_text(&mut fields, "platform"),
        timestamp,
        server_name: take_text(&mut fields, "server_name"),
        environment: take_text(&mut fields, "environment"),
        extra: take_json_text(&mut fields, "extra"),
    })
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Strings are kept verbatim, other non-null values as their JSON text
fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    }
}

fn take_json_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obs_database::test_utils::TestDatabase;
    use sea_orm::EntityTrait;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_parse_event_applies_defaults() {
        let event = parse_event(&body(json!({"message": "x"}))).unwrap();

        assert_eq!(event.message, "x");
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.event_id.len(), 36);
        assert_eq!(event.timestamp.len(), 19);
        assert_eq!(event.stacktrace, None);
        assert_eq!(event.platform, None);
        assert_eq!(event.extra, None);
    }

    #[test]
    fn test_parse_event_keeps_provided_fields() {
        let event = parse_event(&body(json!({
            "event_id": "abc",
            "level": "warning",
            "message": "disk full",
            "stacktrace": [{"filename": "a.rs", "function": "f", "lineno": 3}],
            "platform": "rust",
            "timestamp": "2025-01-15 14:30:00",
            "server_name": "web-1",
            "environment": null,
            "extra": {"free_mb": 12}
        })))
        .unwrap();

        assert_eq!(event.event_id, "abc");
        assert_eq!(event.level, Level::Warning);
        assert_eq!(event.timestamp, "2025-01-15 14:30:00");
        assert_eq!(event.platform.as_deref(), Some("rust"));
        assert_eq!(event.environment, None);
        assert_eq!(
            serde_json::from_str::<Value>(event.stacktrace.as_deref().unwrap()).unwrap(),
            json!([{"filename": "a.rs", "function": "f", "lineno": 3}])
        );
        assert_eq!(event.extra.as_deref(), Some(r#"{"free_mb":12}"#));
    }

    #[test]
    fn test_parse_event_unknown_level_defaults_to_error() {
        let event = parse_event(&body(json!({"message": "x", "level": "fatal"}))).unwrap();
        assert_eq!(event.level, Level::Error);
    }

    #[test]
    fn test_parse_event_rejects_invalid_bodies() {
        assert!(matches!(parse_event(b"{not json"), Err(IngestError::InvalidJson)));
        assert!(matches!(parse_event(b"[1, 2]"), Err(IngestError::InvalidJson)));
        assert!(matches!(parse_event(b""), Err(IngestError::InvalidJson)));
    }

    #[test]
    fn test_parse_event_requires_message() {
        for value in [
            json!({}),
            json!({"message": ""}),
            json!({"message": null}),
            json!({"message": 42}),
        ] {
            assert!(matches!(
                parse_event(&body(value)),
                Err(IngestError::MissingMessage)
            ));
        }
    }

    #[tokio::test]
    async fn test_store_event_rejects_duplicate_id() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let service = EventIngestionService::new(test_db.connection_arc());

        let first = parse_event(&body(json!({"event_id": "dup", "message": "first"})))?;
        let second = parse_event(&body(json!({"event_id": "dup", "message": "second"})))?;

        assert_eq!(service.store_event(first).await?, "dup");
        assert!(matches!(
            service.store_event(second).await,
            Err(IngestError::DuplicateEvent)
        ));

        let stored = events::Entity::find_by_id("dup".to_string())
            .one(test_db.connection())
            .await?
            .unwrap();
        assert_eq!(stored.message, "first");
        Ok(())
    }

    #[tokio::test]
    async fn test_ingest_persists_row() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let service = EventIngestionService::new(test_db.connection_arc());

        let id = service
            .ingest(&body(json!({"message": "hello", "level": "info", "extra": {"k": "v"}})))
            .await?;

        let stored = events::Entity::find_by_id(id)
            .one(test_db.connection())
            .await?
            .unwrap();
        assert_eq!(stored.level, "info");
        assert_eq!(stored.extra_json(), Some(json!({"k": "v"})));
        Ok(())
    }
}
