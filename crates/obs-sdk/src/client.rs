//! Client context: buffering, flushing and lifecycle

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use obs_core::{Event, Level};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dsn::parse_dsn;
use crate::error::ObsError;
use crate::event::{ClientIdentity, EventBuilder, OsRandom, RandomSource};
use crate::options::{host_name, ClientOptions, DEFAULT_FLUSH_TIMEOUT};
use crate::stacktrace::{frames_from_backtrace, normalize_frames};
use crate::transport::{DeliveryResult, HttpTransport, Transport};

/// Handle to an SDK client.
///
/// Cloning is cheap and every clone shares the same state. A default handle is
/// uninitialized: captures are no-ops returning an empty id and flushes succeed
/// immediately.
#[derive(Clone, Default)]
pub struct Obs {
    inner: Arc<RwLock<Option<Arc<ClientState>>>>,
}

struct ClientState {
    identity: ClientIdentity,
    buffer: Mutex<Vec<Event>>,
    transport: Arc<dyn Transport>,
    random: Arc<dyn RandomSource>,
    timer: CancellationToken,
    shut_down: AtomicBool,
}

impl ClientState {
    fn append(&self, event: Event) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn buffered_len(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Swap the live buffer for an empty one and return what it held
    fn take_snapshot(&self) -> Vec<Event> {
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn flush(&self, timeout: Duration) -> bool {
        let snapshot = self.take_snapshot();
        if snapshot.is_empty() {
            return true;
        }

        let count = snapshot.len();
        debug!("Flushing {} event(s)", count);

        let deliveries = snapshot.iter().map(|event| self.deliver(event));
        match tokio::time::timeout(timeout, join_all(deliveries)).await {
            Ok(results) => {
                let failed = results.iter().filter(|r| !r.success).count();
                if failed > 0 {
                    warn!("{} of {} event(s) could not be delivered", failed, count);
                } else {
                    debug!("Delivered {} event(s)", count);
                }
                true
            }
            Err(_) => {
                warn!(
                    "Flush of {} event(s) did not settle within {:?}, pending deliveries cancelled",
                    count, timeout
                );
                false
            }
        }
    }

    async fn deliver(&self, event: &Event) -> DeliveryResult {
        match self.transport.send(event).await {
            Ok(()) => DeliveryResult {
                event_id: event.event_id.clone(),
                success: true,
                error_message: None,
            },
            Err(e) => {
                warn!("Event {} delivery failed: {}", event.event_id, e);
                DeliveryResult {
                    event_id: event.event_id.clone(),
                    success: false,
                    error_message: Some(e.to_string()),
                }
            }
        }
    }
}

/// Initialize a new client. See [`Obs::init`].
pub fn init(options: ClientOptions) -> Result<Obs, ObsError> {
    let obs = Obs::new();
    obs.init(options)?;
    Ok(obs)
}

impl Obs {
    /// An uninitialized handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize (or re-initialize) this handle and every clone of it.
    ///
    /// Re-initializing stops the previous timer; events still buffered under the
    /// previous configuration are dropped.
    pub fn init(&self, options: ClientOptions) -> Result<(), ObsError> {
        let dsn = parse_dsn(&options.dsn)?;

        let transport = options
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::new(&dsn)));
        let identity = ClientIdentity {
            dsn: Some(dsn.clone()),
            environment: options.environment,
            server_name: options.server_name.or_else(host_name),
        };
        let random = options.random.unwrap_or_else(|| Arc::new(OsRandom));

        let state = Arc::new(ClientState {
            identity,
            buffer: Mutex::new(Vec::new()),
            transport,
            random,
            timer: CancellationToken::new(),
            shut_down: AtomicBool::new(false),
        });

        if let Some(period) = options.flush_interval {
            spawn_flush_timer(&state, period);
        }

        let previous = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(state);

        if let Some(previous) = previous {
            previous.timer.cancel();
            let dropped = previous.buffered_len();
            if dropped > 0 {
                warn!("Re-initialized with {} buffered event(s) dropped", dropped);
            }
        }

        info!("Initialized client for {}", dsn.endpoint());
        Ok(())
    }

    fn state(&self) -> Option<Arc<ClientState>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state().is_some()
    }

    /// Build an event and buffer it. Returns its id, or an empty string when
    /// the client is not initialized.
    pub fn capture(&self, builder: EventBuilder) -> String {
        let Some(state) = self.state() else {
            return String::new();
        };

        let event = builder.build(&state.identity, state.random.as_ref(), Utc::now());
        let event_id = event.event_id.clone();
        state.append(event);
        event_id
    }

    pub fn capture_message(&self, message: impl Into<String>, level: Level) -> String {
        self.capture(EventBuilder::new(level, message))
    }

    /// Capture an error with a stack trace rooted at the caller.
    ///
    /// Runtime frames are only present when backtraces are enabled through
    /// `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE`.
    #[track_caller]
    pub fn capture_exception<E>(&self, error: &E) -> String
    where
        E: StdError + ?Sized,
    {
        let location = Location::caller();
        if !self.is_initialized() {
            return String::new();
        }

        let frames = normalize_frames(location, frames_from_backtrace(&Backtrace::capture()));
        let mut builder = EventBuilder::new(Level::Error, error.to_string()).with_stacktrace(frames);

        let causes: Vec<serde_json::Value> = std::iter::successors(error.source(), |&e| e.source())
            .map(|cause| cause.to_string().into())
            .collect();
        if !causes.is_empty() {
            builder = builder.with_extra("causes", causes);
        }

        self.capture(builder)
    }

    /// Capture a message with a textual stack trace
    pub fn capture_trace(&self, level: Level, message: impl Into<String>, trace: &str) -> String {
        self.capture(EventBuilder::new(level, message).with_stacktrace_text(trace))
    }

    /// Number of events waiting for the next flush
    pub fn buffered_len(&self) -> usize {
        self.state().map_or(0, |state| state.buffered_len())
    }

    /// Deliver everything buffered so far within `timeout`.
    ///
    /// Returns `false` only when the budget expired before every delivery
    /// settled. Individual delivery failures do not affect the result, and no
    /// event is ever put back into the buffer.
    pub async fn flush(&self, timeout: Duration) -> bool {
        match self.state() {
            Some(state) => state.flush(timeout).await,
            None => true,
        }
    }

    /// Stop the background timer. Capturing and explicit flushes keep working.
    pub fn close(&self) {
        if let Some(state) = self.state() {
            state.timer.cancel();
        }
    }

    /// Close and run the final flush. Only the first call per initialization
    /// flushes; later calls return `true` immediately.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let Some(state) = self.state() else {
            return true;
        };

        state.timer.cancel();
        if state.shut_down.swap(true, Ordering::SeqCst) {
            return true;
        }

        let flushed = state.flush(timeout).await;
        info!("Shutdown flush finished (complete: {})", flushed);
        flushed
    }
}

fn spawn_flush_timer(state: &Arc<ClientState>, period: Duration) {
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("No tokio runtime available, background flushing disabled");
            return;
        }
    };

    if period.is_zero() {
        warn!("Flush interval must be greater than zero, background flushing disabled");
        return;
    }

    let weak: Weak<ClientState> = Arc::downgrade(state);
    let token = state.timer.clone();

    handle.spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let Some(state) = weak.upgrade() else {
                        break;
                    };
                    if state.buffered_len() > 0 {
                        state.flush(DEFAULT_FLUSH_TIMEOUT).await;
                    }
                }
            }
        }

        debug!("Flush timer stopped");
    });
}
