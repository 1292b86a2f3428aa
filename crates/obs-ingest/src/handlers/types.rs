use std::sync::Arc;

use obs_core::Level;
use obs_entities::events;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::services::{EventGroup, EventIngestionService, EventQueryService};

#[derive(Clone)]
pub struct AppState {
    pub ingestion_service: Arc<EventIngestionService>,
    pub query_service: Arc<EventQueryService>,
    /// Shared secret expected in `X-OBS-Key`; `None` refuses every ingestion
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct ListEventsQuery {
    /// Maximum number of groups, 1 to 1000
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    crate::services::DEFAULT_GROUP_LIMIT
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventGroupResponse {
    pub message: String,
    pub level: Level,
    pub platform: Option<String>,
    #[schema(example = "2025-01-15 14:30:00")]
    pub last_seen: String,
    pub count: i64,
    pub latest_event_id: String,
}

impl From<EventGroup> for EventGroupResponse {
    fn from(group: EventGroup) -> Self {
        Self {
            message: group.message,
            level: group.level,
            platform: group.platform,
            last_seen: group.last_seen,
            count: group.count,
            latest_event_id: group.latest_event_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub event_id: String,
    pub level: Level,
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub stacktrace: Option<serde_json::Value>,
    pub platform: Option<String>,
    #[schema(example = "2025-01-15 14:30:00")]
    pub timestamp: String,
    pub server_name: Option<String>,
    pub environment: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub extra: Option<serde_json::Value>,
}

impl From<events::Model> for EventResponse {
    fn from(model: events::Model) -> Self {
        Self {
            level: model.level(),
            stacktrace: model.stacktrace_json(),
            extra: model.extra_json(),
            event_id: model.id,
            message: model.message,
            platform: model.platform,
            timestamp: model.timestamp,
            server_name: model.server_name,
            environment: model.environment,
        }
    }
}
