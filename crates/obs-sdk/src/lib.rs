//! Client SDK for the obs ingestion gateway
//!
//! Events are captured into an in-memory buffer and delivered in batches,
//! either by a background timer, an explicit [`Obs::flush`], or the final
//! flush run by [`Obs::shutdown`].
//!
//! ```no_run
//! use std::time::Duration;
//! use obs_sdk::{ClientOptions, Level};
//!
//! # async fn run() -> Result<(), obs_sdk::ObsError> {
//! let obs = obs_sdk::init(ClientOptions::new("http://my-key@localhost:8000").environment("production"))?;
//! obs.capture_message("cache warmed", Level::Info);
//! obs.flush(Duration::from_secs(5)).await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod dsn;
pub mod error;
pub mod event;
pub mod hooks;
pub mod options;
pub mod stacktrace;
pub mod transport;

pub use client::{init, Obs};
pub use dsn::{parse_dsn, Dsn};
pub use error::{ObsError, TransportError};
pub use event::{
    generate_event_id, ClientIdentity, EventBuilder, OsRandom, RandomSource, SeededRandom,
    PLATFORM,
};
pub use hooks::{install_panic_hook, install_shutdown_hook, ShutdownGuard};
pub use obs_core::{Event, Frame, Level};
pub use options::{ClientOptions, DEFAULT_FLUSH_INTERVAL, DEFAULT_FLUSH_TIMEOUT};
pub use stacktrace::{frames_from_backtrace, normalize_frames, parse_stack, RawFrame};
pub use transport::{DeliveryResult, HttpTransport, Transport};
