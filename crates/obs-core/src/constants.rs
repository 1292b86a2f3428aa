/// Path of the ingestion endpoint, relative to the DSN endpoint
pub const INGEST_PATH: &str = "/api/events";

/// Header carrying the shared API credential
pub const API_KEY_HEADER: &str = "x-obs-key";

/// `strftime` pattern of every event timestamp: second precision, no zone suffix
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
