pub mod event_ingestion_service;
pub mod event_query_service;
pub mod types;

pub use event_ingestion_service::{parse_event, EventIngestionService};
pub use event_query_service::{EventQueryService, DEFAULT_GROUP_LIMIT, MAX_GROUP_LIMIT};
pub use types::{EventGroup, IngestError, NewEvent};
