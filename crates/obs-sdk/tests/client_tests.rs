use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use obs_sdk::{
    init, ClientOptions, Event, Level, Obs, SeededRandom, ShutdownGuard, Transport,
    TransportError,
};
use tokio::sync::{Notify, Semaphore};

/// Records every event it is asked to send
#[derive(Default)]
struct RecordingTransport {
    events: Mutex<Vec<Event>>,
}

impl RecordingTransport {
    fn sent(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, event: &Event) -> Result<(), TransportError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Never completes within any reasonable budget
#[derive(Default)]
struct SlowTransport {
    started: AtomicUsize,
}

#[async_trait]
impl Transport for SlowTransport {
    async fn send(&self, _event: &Event) -> Result<(), TransportError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// Fails every event whose message starts with "fail"
#[derive(Default)]
struct FlakyTransport {
    attempts: AtomicUsize,
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn send(&self, event: &Event) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if event.message.starts_with("fail") {
            Err(TransportError::Other("gateway unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Holds every send until released
struct GatedTransport {
    started: Notify,
    release: Semaphore,
    delivered: Mutex<Vec<String>>,
}

impl GatedTransport {
    fn new() -> Self {
        Self {
            started: Notify::new(),
            release: Semaphore::new(0),
            delivered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, event: &Event) -> Result<(), TransportError> {
        self.started.notify_one();
        let _permit = self
            .release
            .acquire()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;
        self.delivered.lock().unwrap().push(event.event_id.clone());
        Ok(())
    }
}

fn options(transport: Arc<dyn Transport>) -> ClientOptions {
    ClientOptions::new("http://test-key@localhost:8000")
        .environment("test")
        .server_name("test-host")
        .flush_interval(None)
        .transport(transport)
}

#[tokio::test]
async fn test_flush_delivers_every_buffered_event() {
    let transport = Arc::new(RecordingTransport::default());
    let obs = init(options(transport.clone())).unwrap();

    let mut ids = HashSet::new();
    for i in 0..5 {
        ids.insert(obs.capture_message(format!("message {}", i), Level::Warning));
    }
    assert_eq!(obs.buffered_len(), 5);

    assert!(obs.flush(Duration::from_secs(5)).await);
    assert_eq!(obs.buffered_len(), 0);

    let sent = transport.sent();
    assert_eq!(sent.len(), 5);
    let sent_ids: HashSet<String> = sent.iter().map(|e| e.event_id.clone()).collect();
    assert_eq!(sent_ids, ids);
    for event in &sent {
        assert_eq!(event.level, Level::Warning);
        assert_eq!(event.platform, "rust");
        assert_eq!(event.environment.as_deref(), Some("test"));
        assert_eq!(event.server_name.as_deref(), Some("test-host"));
    }
}

#[tokio::test]
async fn test_flush_empty_buffer_sends_nothing() {
    let transport = Arc::new(RecordingTransport::default());
    let obs = init(options(transport.clone())).unwrap();

    assert!(obs.flush(Duration::from_secs(5)).await);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_events_are_sent_once() {
    let transport = Arc::new(RecordingTransport::default());
    let obs = init(options(transport.clone())).unwrap();

    obs.capture_message("only once", Level::Info);
    assert!(obs.flush(Duration::from_secs(5)).await);
    assert!(obs.flush(Duration::from_secs(5)).await);

    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_flush_times_out_without_requeue() {
    let transport = Arc::new(SlowTransport::default());
    let obs = init(options(transport.clone())).unwrap();

    obs.capture_message("first", Level::Error);
    obs.capture_message("second", Level::Error);

    assert!(!obs.flush(Duration::from_millis(100)).await);
    assert_eq!(transport.started.load(Ordering::SeqCst), 2);
    assert_eq!(obs.buffered_len(), 0);
}

#[tokio::test]
async fn test_failed_deliveries_do_not_fail_flush() {
    let transport = Arc::new(FlakyTransport::default());
    let obs = init(options(transport.clone())).unwrap();

    obs.capture_message("fail: first", Level::Error);
    obs.capture_message("ok", Level::Info);
    obs.capture_message("fail: second", Level::Error);

    assert!(obs.flush(Duration::from_secs(5)).await);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(obs.buffered_len(), 0);
}

#[tokio::test]
async fn test_capture_during_flush_lands_in_next_batch() {
    let transport = Arc::new(GatedTransport::new());
    let obs = init(options(transport.clone())).unwrap();

    let first = obs.capture_message("before flush", Level::Info);

    let flushing = obs.clone();
    let in_flight = tokio::spawn(async move { flushing.flush(Duration::from_secs(30)).await });

    transport.started.notified().await;
    let second = obs.capture_message("during flush", Level::Info);
    assert_eq!(obs.buffered_len(), 1);

    transport.release.add_permits(10);
    assert!(in_flight.await.unwrap());
    assert_eq!(*transport.delivered.lock().unwrap(), vec![first.clone()]);
    assert_eq!(obs.buffered_len(), 1);

    assert!(obs.flush(Duration::from_secs(30)).await);
    assert_eq!(*transport.delivered.lock().unwrap(), vec![first, second]);
}

#[tokio::test(start_paused = true)]
async fn test_timer_flushes_without_explicit_call() {
    let transport = Arc::new(RecordingTransport::default());
    let obs = init(options(transport.clone()).flush_interval(Some(Duration::from_secs(5)))).unwrap();

    obs.capture_message("picked up by timer", Level::Info);
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(transport.sent().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(obs.buffered_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_timer() {
    let transport = Arc::new(RecordingTransport::default());
    let obs = init(options(transport.clone()).flush_interval(Some(Duration::from_secs(5)))).unwrap();

    obs.close();
    obs.close();
    obs.capture_message("still buffered", Level::Info);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(transport.sent().is_empty());
    assert_eq!(obs.buffered_len(), 1);

    assert!(obs.flush(Duration::from_secs(5)).await);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_seeded_random_gives_reproducible_ids() {
    let first_run = {
        let obs = init(
            options(Arc::new(RecordingTransport::default())).random(Arc::new(SeededRandom::new(7))),
        )
        .unwrap();
        (obs.capture_message("a", Level::Info), obs.capture_message("b", Level::Info))
    };
    let second_run = {
        let obs = init(
            options(Arc::new(RecordingTransport::default())).random(Arc::new(SeededRandom::new(7))),
        )
        .unwrap();
        (obs.capture_message("a", Level::Info), obs.capture_message("b", Level::Info))
    };

    assert_eq!(first_run, second_run);
    assert_ne!(first_run.0, first_run.1);
}

#[tokio::test]
async fn test_clones_share_state() {
    let transport = Arc::new(RecordingTransport::default());
    let obs = Obs::new();
    let clone = obs.clone();

    assert_eq!(clone.capture_message("dropped", Level::Info), "");
    obs.init(options(transport.clone())).unwrap();
    assert!(!clone.capture_message("kept", Level::Info).is_empty());

    assert!(obs.flush(Duration::from_secs(5)).await);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "kept");
}

#[tokio::test]
async fn test_capture_trace_parses_frames() {
    let transport = Arc::new(RecordingTransport::default());
    let obs = init(options(transport.clone())).unwrap();

    obs.capture_trace(
        Level::Error,
        "TypeError: undefined is not a function",
        "TypeError: undefined is not a function\n    at render (/srv/app/view.js:12:7)\n    at /srv/app/index.js:3:1",
    );
    assert!(obs.flush(Duration::from_secs(5)).await);

    let frames = transport.sent()[0].stacktrace.clone().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].function, "render");
    assert_eq!(frames[1].function, "(anonymous)");
}

#[test]
fn test_shutdown_guard_runs_final_flush_once() {
    let transport = Arc::new(RecordingTransport::default());
    let obs = init(options(transport.clone())).unwrap();

    obs.capture_message("flushed on drop", Level::Info);
    drop(ShutdownGuard::new(obs.clone(), Duration::from_secs(5)));
    assert_eq!(transport.sent().len(), 1);

    obs.capture_message("after shutdown", Level::Info);
    drop(ShutdownGuard::new(obs.clone(), Duration::from_secs(5)));
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(obs.buffered_len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_and_flushes_deliver_each_event_once() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 1000;

    let transport = Arc::new(RecordingTransport::default());
    let obs = init(options(transport.clone()).flush_interval(Some(Duration::from_millis(1)))).unwrap();

    let producers = {
        let obs = obs.clone();
        tokio::task::spawn_blocking(move || {
            let handles: Vec<_> = (0..PRODUCERS)
                .map(|producer| {
                    let obs = obs.clone();
                    std::thread::spawn(move || {
                        (0..PER_PRODUCER)
                            .map(|i| obs.capture_message(format!("p{}-{}", producer, i), Level::Info))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect::<Vec<String>>()
        })
    };

    let flusher = {
        let obs = obs.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                assert!(obs.flush(Duration::from_secs(5)).await);
                tokio::task::yield_now().await;
            }
        })
    };

    let captured = producers.await.unwrap();
    flusher.await.unwrap();
    assert!(obs.shutdown(Duration::from_secs(5)).await);

    // A timer flush may still be settling after the final flush returned
    for _ in 0..200 {
        if transport.sent().len() >= captured.len() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let sent: Vec<String> = transport.sent().into_iter().map(|event| event.event_id).collect();
    let unique: HashSet<&String> = sent.iter().collect();
    let expected: HashSet<&String> = captured.iter().collect();

    assert_eq!(captured.len(), PRODUCERS * PER_PRODUCER);
    assert_eq!(expected.len(), captured.len());
    assert_eq!(sent.len(), captured.len());
    assert_eq!(unique, expected);
    assert_eq!(obs.buffered_len(), 0);
}
