//! Event construction

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use obs_core::{utils::format_timestamp, Event, Frame, Level};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

use crate::dsn::Dsn;
use crate::stacktrace::parse_stack;

/// Platform tag carried by every event this SDK produces
pub const PLATFORM: &str = "rust";

/// Source of the 16 random bytes behind each event identifier
pub trait RandomSource: Send + Sync {
    fn fill(&self, bytes: &mut [u8; 16]);
}

/// Operating system randomness, falling back to the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, bytes: &mut [u8; 16]) {
        if let Err(e) = OsRng.try_fill_bytes(bytes) {
            tracing::debug!("OS randomness unavailable, using thread rng: {}", e);
            rand::thread_rng().fill_bytes(bytes);
        }
    }
}

/// Deterministic generator for reproducible identifiers
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn fill(&self, bytes: &mut [u8; 16]) {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.fill_bytes(bytes);
    }
}

/// Generate a version 4 UUID from the given randomness, hyphenated lowercase
pub fn generate_event_id(random: &dyn RandomSource) -> String {
    let mut bytes = [0u8; 16];
    random.fill(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

/// Client-wide values fixed at initialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Endpoint and API key; the key is masked in `Debug` output
    pub dsn: Option<Dsn>,
    /// Stamped onto every event
    pub environment: Option<String>,
    pub server_name: Option<String>,
}

/// Assembles an [`Event`] from per-capture fields
#[derive(Debug, Clone)]
pub struct EventBuilder {
    level: Level,
    message: String,
    stacktrace: Option<Vec<Frame>>,
    extra: Option<HashMap<String, serde_json::Value>>,
}

impl EventBuilder {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            stacktrace: None,
            extra: None,
        }
    }

    /// Attach already normalized frames. An empty list leaves the trace absent.
    pub fn with_stacktrace(mut self, frames: Vec<Frame>) -> Self {
        self.stacktrace = (!frames.is_empty()).then_some(frames);
        self
    }

    /// Attach a textual trace, parsed line by line
    pub fn with_stacktrace_text(self, text: &str) -> Self {
        self.with_stacktrace(parse_stack(Some(text)))
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Produce the event with a fresh identifier and the given capture time
    pub fn build(
        self,
        identity: &ClientIdentity,
        random: &dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Event {
        Event {
            event_id: generate_event_id(random),
            level: self.level,
            message: self.message,
            stacktrace: self.stacktrace,
            platform: PLATFORM.to_string(),
            timestamp: format_timestamp(now),
            server_name: identity.server_name.clone(),
            environment: identity.environment.clone(),
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn identity() -> ClientIdentity {
        ClientIdentity {
            dsn: None,
            environment: Some("production".to_string()),
            server_name: Some("web-1".to_string()),
        }
    }

    #[test]
    fn test_generate_event_id_is_v4() {
        let id = generate_event_id(&OsRandom);
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(id, id.to_lowercase());
        assert_eq!(id.len(), 36);
        assert_eq!(&id[14..15], "4");
    }

    #[test]
    fn test_event_ids_are_unique() {
        let ids: HashSet<String> = (0..100).map(|_| generate_event_id(&OsRandom)).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_seeded_ids_are_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let first: Vec<String> = (0..3).map(|_| generate_event_id(&a)).collect();
        let second: Vec<String> = (0..3).map(|_| generate_event_id(&b)).collect();
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);

        for id in &first {
            let parsed = Uuid::parse_str(id).unwrap();
            assert_eq!(parsed.get_version_num(), 4);
            assert_eq!(parsed.get_variant(), uuid::Variant::RFC4122);
        }
    }

    #[test]
    fn test_build_stamps_identity_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();
        let event = EventBuilder::new(Level::Warning, "disk almost full")
            .with_extra("free_mb", 12)
            .build(&identity(), &SeededRandom::new(1), now);

        assert_eq!(event.level, Level::Warning);
        assert_eq!(event.message, "disk almost full");
        assert_eq!(event.platform, "rust");
        assert_eq!(event.timestamp, "2025-01-15 14:30:00");
        assert_eq!(event.environment.as_deref(), Some("production"));
        assert_eq!(event.server_name.as_deref(), Some("web-1"));
        assert_eq!(event.stacktrace, None);
        assert_eq!(event.extra.unwrap()["free_mb"], json!(12));
    }

    #[test]
    fn test_build_with_stacktrace_text() {
        let event = EventBuilder::new(Level::Error, "boom")
            .with_stacktrace_text("Error: boom\n    at run (/srv/app.js:4:2)")
            .build(&ClientIdentity::default(), &OsRandom, Utc::now());

        let frames = event.stacktrace.unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].function, "run");
        assert_eq!(event.environment, None);
    }

    #[test]
    fn test_unparseable_text_leaves_trace_absent() {
        let event = EventBuilder::new(Level::Error, "boom")
            .with_stacktrace_text("nothing useful here")
            .build(&ClientIdentity::default(), &OsRandom, Utc::now());
        assert!(event.stacktrace.is_none());
    }
}
