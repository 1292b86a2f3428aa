//! Database entities for the obs ingestion gateway

pub mod events;
