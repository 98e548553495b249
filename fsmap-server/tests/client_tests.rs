//! Integration tests for the telemetry client state machine
//!
//! Time is paused, so timeouts and backoff delays elapse instantly while the
//! recorded call instants still reflect the scheduled gaps.

use fsmap_core::{
    ClientEvent, ConnectionState, FetchError, MapSession, PollPolicy, TelemetrySample,
    TelemetrySource,
};
use fsmap_server::TelemetryClient;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout, Instant};

enum Step {
    Respond(TelemetrySample),
    Fail(FetchError),
    /// Never completes; records when the request is dropped
    Hang,
    Delayed(Duration, TelemetrySample),
}

#[derive(Default)]
struct Calls {
    log: Mutex<Vec<(Instant, IpAddr)>>,
    aborted: AtomicBool,
}

impl Calls {
    fn instants(&self) -> Vec<Instant> {
        self.log.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    fn hosts(&self) -> Vec<IpAddr> {
        self.log.lock().unwrap().iter().map(|(_, host)| *host).collect()
    }
}

struct AbortFlag(Arc<Calls>);

impl Drop for AbortFlag {
    fn drop(&mut self) {
        self.0.aborted.store(true, Ordering::SeqCst);
    }
}

/// Plays back a fixed list of outcomes, then hangs forever
struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    calls: Arc<Calls>,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let source = Self {
            steps: Mutex::new(steps.into()),
            calls: calls.clone(),
        };
        (source, calls)
    }

    fn next_step(&self, host: IpAddr) -> Step {
        self.calls.log.lock().unwrap().push((Instant::now(), host));
        self.steps.lock().unwrap().pop_front().unwrap_or(Step::Hang)
    }
}

impl TelemetrySource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, host: IpAddr) -> Result<TelemetrySample, FetchError> {
        match self.next_step(host) {
            Step::Respond(sample) => Ok(sample),
            Step::Fail(e) => Err(e),
            Step::Hang => {
                let _flag = AbortFlag(self.calls.clone());
                std::future::pending().await
            }
            Step::Delayed(delay, sample) => {
                sleep(delay).await;
                Ok(sample)
            }
        }
    }
}

fn sample(lat: f64, lon: f64) -> TelemetrySample {
    TelemetrySample::new(lat, lon, 90.0, 100.0, 1000.0)
}

struct Harness {
    client: TelemetryClient,
    address_tx: watch::Sender<String>,
    events_rx: mpsc::Receiver<ClientEvent>,
}

fn start(source: ScriptedSource, address: &str) -> Harness {
    let (address_tx, address_rx) = watch::channel(address.to_string());
    let (events_tx, events_rx) = mpsc::channel(64);
    let client = TelemetryClient::spawn(source, PollPolicy::default(), address_rx, events_tx);
    Harness {
        client,
        address_tx,
        events_rx,
    }
}

impl Harness {
    async fn next(&mut self) -> ClientEvent {
        timeout(Duration::from_secs(60), self.events_rx.recv())
            .await
            .expect("no event within 60s")
            .expect("event channel closed")
    }

    async fn next_sample(&mut self) -> TelemetrySample {
        match self.next().await {
            ClientEvent::Sample(sample) => sample,
            other => panic!("expected a sample, got {:?}", other),
        }
    }

    /// True if nothing arrives within `window`
    async fn quiet_for(&mut self, window: Duration) -> bool {
        timeout(window, self.events_rx.recv()).await.is_err()
    }
}

fn assert_gap(from: Instant, to: Instant, expected: Duration) {
    let gap = to - from;
    assert!(
        gap >= expected && gap < expected + Duration::from_millis(50),
        "gap {:?}, expected about {:?}",
        gap,
        expected
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_backs_off_then_success_polls_fast() {
    let (source, calls) = ScriptedSource::new(vec![Step::Hang, Step::Respond(sample(10.0, 20.0))]);
    let mut h = start(source, "192.168.1.5");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Polling));
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Disconnected));
    let received = h.next_sample().await;
    assert_eq!(received.latitude, 10.0);
    assert_eq!(received.longitude, 20.0);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Connected));

    // Let the third attempt start
    sleep(Duration::from_secs(2)).await;

    let instants = calls.instants();
    assert_eq!(instants.len(), 3);
    // 3s timeout plus 10s backoff
    assert_gap(instants[0], instants[1], Duration::from_secs(13));
    assert_gap(instants[1], instants[2], Duration::from_secs(1));
    assert!(calls.aborted.load(Ordering::SeqCst));

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_every_failure_kind_backs_off_slowly() {
    let (source, calls) = ScriptedSource::new(vec![
        Step::Fail(FetchError::Network("connection refused".into())),
        Step::Fail(FetchError::UnexpectedStatus(503)),
        Step::Fail(FetchError::MalformedResponse("missing field `lat`".into())),
    ]);
    let mut h = start(source, "10.0.0.1");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Polling));
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Disconnected));
    // Repeated failures do not repeat the state
    assert!(h.quiet_for(Duration::from_secs(35)).await);

    let instants = calls.instants();
    assert_eq!(instants.len(), 4);
    for pair in instants.windows(2) {
        assert_gap(pair[0], pair[1], Duration::from_secs(10));
    }

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_success_then_failure_clears_sample() {
    let (source, _calls) = ScriptedSource::new(vec![
        Step::Respond(sample(1.0, 1.0)),
        Step::Fail(FetchError::Network("reset".into())),
        Step::Respond(sample(2.0, 2.0)),
    ]);
    let mut h = start(source, "10.0.0.1");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Polling));
    assert_eq!(h.next_sample().await.latitude, 1.0);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Connected));
    assert_eq!(h.next().await, ClientEvent::SampleCleared);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Disconnected));
    assert_eq!(h.next_sample().await.latitude, 2.0);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Connected));

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_address_never_polls() {
    let (source, calls) = ScriptedSource::new(vec![Step::Respond(sample(5.0, 6.0))]);
    let mut h = start(source, "not-an-ip");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Disconnected));
    assert!(h.quiet_for(Duration::from_secs(35)).await);
    assert!(calls.instants().is_empty());

    h.address_tx.send("10.0.0.9".to_string()).unwrap();

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Polling));
    assert_eq!(h.next_sample().await.latitude, 5.0);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Connected));
    assert_eq!(calls.hosts(), vec!["10.0.0.9".parse::<IpAddr>().unwrap()]);

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_demo_emits_drifting_samples_without_network() {
    let (source, calls) = ScriptedSource::new(vec![]);
    let mut h = start(source, "99999");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Demo));

    let mut previous = h.next_sample().await;
    for _ in 0..4 {
        let next = h.next_sample().await;
        assert!(next.latitude > previous.latitude);
        assert!(next.longitude > previous.longitude);
        previous = next;
    }
    assert!(calls.instants().is_empty());

    h.address_tx.send(String::new()).unwrap();

    assert_eq!(h.next().await, ClientEvent::SampleCleared);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Disconnected));
    assert!(h.quiet_for(Duration::from_secs(30)).await);

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_demo_samples_arrive_once_per_second() {
    let (source, _calls) = ScriptedSource::new(vec![]);
    let mut h = start(source, "99999");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Demo));
    let started = Instant::now();
    h.next_sample().await;
    let first = Instant::now();
    h.next_sample().await;
    let second = Instant::now();

    assert_gap(started, first, Duration::from_secs(1));
    assert_gap(first, second, Duration::from_secs(1));

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_switch_to_demo_clears_host_sample_first() {
    let (source, _calls) = ScriptedSource::new(vec![Step::Respond(sample(1.0, 1.0))]);
    let mut h = start(source, "10.0.0.1");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Polling));
    assert_eq!(h.next_sample().await.latitude, 1.0);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Connected));

    h.address_tx.send("99999".to_string()).unwrap();

    assert_eq!(h.next().await, ClientEvent::SampleCleared);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Demo));
    let demo = h.next_sample().await;
    assert!((demo.latitude - 42.532219).abs() < 0.1);

    h.client.shutdown().await;
}

/// Connected always has a sample behind it, Disconnected never does
fn assert_state_consistent(session: &MapSession, after: &ClientEvent) {
    match session.connection() {
        ConnectionState::Connected => assert!(
            session.sample().is_some(),
            "connected without a sample after {:?}",
            after
        ),
        ConnectionState::Disconnected => assert!(
            session.sample().is_none(),
            "disconnected with a sample after {:?}",
            after
        ),
        _ => {}
    }
}

#[tokio::test(start_paused = true)]
async fn test_session_never_sees_inconsistent_connection_state() {
    let (source, _calls) = ScriptedSource::new(vec![
        Step::Respond(sample(1.0, 1.0)),
        Step::Fail(FetchError::Network("reset".into())),
        Step::Respond(sample(2.0, 2.0)),
    ]);
    let mut h = start(source, "10.0.0.1");
    let mut session = MapSession::new();

    // success, failure, success
    for _ in 0..7 {
        let event = h.next().await;
        session.apply(event.clone());
        assert_state_consistent(&session, &event);
    }
    assert_eq!(session.connection(), ConnectionState::Connected);
    assert_eq!(session.sample().unwrap().latitude, 2.0);

    h.address_tx.send("99999".to_string()).unwrap();
    // clear, demo, two ticks
    for _ in 0..4 {
        let event = h.next().await;
        session.apply(event.clone());
        assert_state_consistent(&session, &event);
    }
    assert_eq!(session.connection(), ConnectionState::Demo);

    h.address_tx.send(String::new()).unwrap();
    for _ in 0..2 {
        let event = h.next().await;
        session.apply(event.clone());
        assert_state_consistent(&session, &event);
    }
    assert_eq!(session.connection(), ConnectionState::Disconnected);
    assert!(session.sample().is_none());

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_response_for_previous_address_is_discarded() {
    let (source, calls) = ScriptedSource::new(vec![Step::Delayed(
        Duration::from_secs(2),
        sample(50.0, 50.0),
    )]);
    let mut h = start(source, "10.0.0.1");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Polling));

    sleep(Duration::from_secs(1)).await;
    h.address_tx.send("10.0.0.2".to_string()).unwrap();

    // The new address hangs, so the next event is its timeout, not the
    // delayed sample from the old one
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Disconnected));
    assert_eq!(
        calls.hosts(),
        vec![
            "10.0.0.1".parse::<IpAddr>().unwrap(),
            "10.0.0.2".parse::<IpAddr>().unwrap(),
        ]
    );

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_address_change_reenters_polling() {
    let (source, _calls) = ScriptedSource::new(vec![
        Step::Respond(sample(1.0, 1.0)),
        Step::Respond(sample(2.0, 2.0)),
    ]);
    let mut h = start(source, "10.0.0.1");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Polling));
    h.next_sample().await;
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Connected));

    h.address_tx.send("10.0.0.2".to_string()).unwrap();

    assert_eq!(h.next().await, ClientEvent::SampleCleared);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Polling));
    assert_eq!(h.next_sample().await.latitude, 2.0);
    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Connected));

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_in_flight_request() {
    let (source, calls) = ScriptedSource::new(vec![Step::Hang]);
    let mut h = start(source, "10.0.0.1");

    assert_eq!(h.next().await, ClientEvent::Connection(ConnectionState::Polling));
    assert!(!calls.aborted.load(Ordering::SeqCst));

    h.client.shutdown().await;

    assert!(calls.aborted.load(Ordering::SeqCst));
    assert_eq!(h.events_rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_client_stops_when_address_sender_dropped() {
    let (source, _calls) = ScriptedSource::new(vec![]);
    let Harness {
        client,
        address_tx,
        mut events_rx,
    } = start(source, "");

    assert_eq!(
        events_rx.recv().await,
        Some(ClientEvent::Connection(ConnectionState::Disconnected))
    );
    drop(address_tx);

    assert_eq!(events_rx.recv().await, None);
    client.shutdown().await;
}
