use obs_core::Level;
use sea_orm::{DbErr, FromQueryResult};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("OBS_API_KEY not configured")]
    MissingApiKeyConfig,

    #[error("Invalid API key")]
    Unauthorized,

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing required field: message")]
    MissingMessage,

    #[error("Event already exists")]
    DuplicateEvent,

    #[error("Event not found")]
    EventNotFound,

    #[error("Failed to store event: {0}")]
    Storage(DbErr),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A validated event with server-side defaults applied, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_id: String,
    pub level: Level,
    pub message: String,
    /// Serialized JSON text
    pub stacktrace: Option<String>,
    pub platform: Option<String>,
    pub timestamp: String,
    pub server_name: Option<String>,
    pub environment: Option<String>,
    /// Serialized JSON text
    pub extra: Option<String>,
}

/// Aggregate row of the grouped listing
#[derive(Debug, Clone, FromQueryResult)]
pub struct GroupRow {
    pub message: String,
    pub last_seen: String,
    pub count: i64,
}

/// Events sharing a message, described by their most recent occurrence
#[derive(Debug, Clone, Serialize)]
pub struct EventGroup {
    pub message: String,
    pub level: Level,
    pub platform: Option<String>,
    pub last_seen: String,
    pub count: i64,
    pub latest_event_id: String,
}
