//! Common utility functions

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::TIMESTAMP_FORMAT;

/// Generate a new event identifier (UUID v4, hyphenated lowercase)
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Format a UTC instant the way events carry it: `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Current UTC time in event timestamp format
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Mask sensitive data for logging
pub fn mask_sensitive(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "***".to_string()
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
