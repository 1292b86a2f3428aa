//! Wire types exchanged between the SDK and the ingestion gateway

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Severity of a captured event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Error,
    Warning,
    Info,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Error, Level::Warning, Level::Info];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

/// One call-site entry of a stack trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Frame {
    pub filename: String,
    /// `"(anonymous)"` when the function name could not be recovered
    pub function: String,
    pub lineno: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,
}

impl Frame {
    /// Marker used when a frame has no recoverable function name
    pub const ANONYMOUS: &'static str = "(anonymous)";
    /// Marker of the synthetic frame pointing at the raise site
    pub const THROW: &'static str = "(throw)";
}

/// A captured event as sent over the wire, one per ingestion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub event_id: String,
    pub level: Level,
    pub message: String,
    /// Innermost frame first, mirroring the source trace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Vec<Frame>>,
    pub platform: String,
    /// `YYYY-MM-DD HH:MM:SS` in UTC
    #[schema(example = "2025-01-15 14:30:00")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub extra: Option<HashMap<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Warning).unwrap(), r#""warning""#);
        assert_eq!("info".parse::<Level>().unwrap(), Level::Info);
        assert!("fatal".parse::<Level>().is_err());
        assert!("Error".parse::<Level>().is_err());
    }

    #[test]
    fn test_event_omits_absent_optional_fields() {
        let event = Event {
            event_id: "id".to_string(),
            level: Level::Info,
            message: "hello".to_string(),
            stacktrace: None,
            platform: "rust".to_string(),
            timestamp: "2025-01-15 14:30:00".to_string(),
            server_name: None,
            environment: None,
            extra: None,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event_id": "id",
                "level": "info",
                "message": "hello",
                "platform": "rust",
                "timestamp": "2025-01-15 14:30:00",
            })
        );
    }

    #[test]
    fn test_frame_without_colno() {
        let frame = Frame {
            filename: "src/main.rs".to_string(),
            function: Frame::THROW.to_string(),
            lineno: 7,
            colno: None,
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert!(value.get("colno").is_none());
        assert_eq!(value["function"], "(throw)");
    }
}
