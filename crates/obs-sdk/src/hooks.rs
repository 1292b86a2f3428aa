//! Integration with process termination and panics

use std::backtrace::Backtrace;
use std::time::Duration;

use obs_core::Level;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::client::Obs;
use crate::event::EventBuilder;
use crate::stacktrace::{frames_from_backtrace, normalize_frames};

/// Exit code of a process terminated by Ctrl+C
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Run [`Obs::shutdown`] when the process receives Ctrl+C, then exit.
///
/// Returns `None` outside of a tokio runtime.
pub fn install_shutdown_hook(obs: Obs, timeout: Duration) -> Option<JoinHandle<()>> {
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("No tokio runtime available, shutdown hook not installed");
            return None;
        }
    };

    Some(handle.spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        info!("Received Ctrl+C, flushing buffered events");
        obs.shutdown(timeout).await;
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }))
}

/// Runs the final flush when dropped, for programs that end by returning from `main`.
///
/// The flush runs on a dedicated thread with its own runtime, so the guard can
/// be dropped from synchronous or asynchronous code alike.
#[must_use = "the final flush runs when the guard is dropped"]
pub struct ShutdownGuard {
    obs: Obs,
    timeout: Duration,
}

impl ShutdownGuard {
    pub fn new(obs: Obs, timeout: Duration) -> Self {
        Self { obs, timeout }
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        let obs = self.obs.clone();
        let timeout = self.timeout;

        let worker = std::thread::spawn(move || {
            match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime.block_on(obs.shutdown(timeout)),
                Err(e) => {
                    error!("Failed to start runtime for final flush: {}", e);
                    false
                }
            }
        });

        if worker.join().is_err() {
            error!("Final flush thread panicked");
        }
    }
}

/// Capture panics as `error` events, then defer to the previously installed hook.
///
/// Panic events are buffered like any other capture; pair this with a
/// [`ShutdownGuard`] or an explicit flush so they are delivered.
pub fn install_panic_hook(obs: Obs) {
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_string());

        let mut builder = EventBuilder::new(Level::Error, message);
        if let Some(location) = info.location() {
            let frames = normalize_frames(location, frames_from_backtrace(&Backtrace::capture()));
            builder = builder.with_stacktrace(frames);
        }
        obs.capture(builder);

        previous(info);
    }));
}
