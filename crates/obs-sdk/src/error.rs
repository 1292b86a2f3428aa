use thiserror::Error;

/// Errors surfaced to the host application by the SDK
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObsError {
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),
}

/// Errors produced while delivering a single event
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Gateway rejected event with status {status}")]
    Status { status: u16 },

    #[error("{0}")]
    Other(String),
}
