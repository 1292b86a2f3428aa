//! Core types and utilities shared by the obs SDK and the ingestion gateway

mod constants;
pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use constants::*;
pub use error::*;
pub use types::*;
pub use utils::*;

// Re-export external dependencies
pub use chrono;
pub use serde_json;
