//! Telemetry client
//!
//! Drives one [`TelemetrySource`] against whatever address is currently in
//! the address channel. Each address value gets its own session, backed by a
//! child [`CancellationToken`]; changing the address cancels the session, so
//! a response that arrives for the old address is never published.
//!
//! A session is one of three loops:
//! - unusable address: report `Disconnected` and recheck on the slow interval
//! - demo sentinel: emit synthetic samples on the demo interval
//! - host: poll with a request timeout, rescheduling per [`PollPolicy`]

use fsmap_core::{
    ClientEvent, ConnectionState, FetchError, PollPolicy, ServerAddress, TelemetrySample,
    TelemetrySource,
};
use fsmap_sources::DemoSource;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Handle to the background polling task
///
/// Dropping the handle stops the task; [`TelemetryClient::shutdown`] also
/// waits for it to finish.
pub struct TelemetryClient {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl TelemetryClient {
    /// Start polling
    ///
    /// The task reads the address from `address_rx` and reports through
    /// `events_tx`. It stops on shutdown, when the address sender is dropped,
    /// or when the event receiver is dropped.
    pub fn spawn<S>(
        source: S,
        policy: PollPolicy,
        address_rx: watch::Receiver<String>,
        events_tx: mpsc::Sender<ClientEvent>,
    ) -> Self
    where
        S: TelemetrySource + 'static,
    {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(
            source,
            policy,
            address_rx,
            Publisher::new(events_tx),
            shutdown.clone(),
        ));

        Self {
            _guard: shutdown.clone().drop_guard(),
            shutdown,
            task,
        }
    }

    /// Stop polling, aborting any in-flight request, and wait for the task
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!("Telemetry client task failed: {}", e);
        }
    }
}

async fn run<S: TelemetrySource>(
    source: S,
    policy: PollPolicy,
    mut address_rx: watch::Receiver<String>,
    mut publisher: Publisher,
    shutdown: CancellationToken,
) {
    info!(source = source.name(), "Telemetry client started");

    loop {
        let raw = address_rx.borrow_and_update().clone();
        let session = shutdown.child_token();
        let address = ServerAddress::parse(&raw);
        debug!(address = %raw, "Starting session");

        let outcome = tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            changed = address_rx.changed() => {
                session.cancel();
                if changed.is_err() {
                    debug!("Address channel closed");
                    break;
                }
                if address.is_demo() {
                    info!("Leaving demo mode");
                }
                let next = address_rx.borrow().clone();
                info!(from = %raw, to = %next, "Server address changed");
                continue;
            }

            outcome = run_session(&source, &policy, &address, &mut publisher, &session) => outcome,
        };

        if outcome.is_err() {
            debug!("Event receiver dropped");
            break;
        }
        if shutdown.is_cancelled() {
            break;
        }
    }

    info!("Telemetry client stopped");
}

/// Returns `Ok` only when the session was cancelled
async fn run_session<S: TelemetrySource>(
    source: &S,
    policy: &PollPolicy,
    address: &ServerAddress,
    publisher: &mut Publisher,
    session: &CancellationToken,
) -> Result<(), ChannelClosed> {
    match address {
        ServerAddress::Unconfigured(raw) => wait_for_address(raw, policy, publisher, session).await,
        ServerAddress::Demo => run_demo(policy, publisher, session).await,
        ServerAddress::Host(ip) => poll_host(source, *ip, policy, publisher, session).await,
    }
}

async fn wait_for_address(
    raw: &str,
    policy: &PollPolicy,
    publisher: &mut Publisher,
    session: &CancellationToken,
) -> Result<(), ChannelClosed> {
    let decision = policy.unconfigured();
    publisher.clear().await?;
    publisher.state(decision.state).await?;

    loop {
        debug!(
            address = raw,
            "No valid server address, checking again in {}s",
            decision.delay.as_secs()
        );
        tokio::select! {
            _ = session.cancelled() => return Ok(()),
            _ = sleep(decision.delay) => {}
        }
    }
}

async fn run_demo(
    policy: &PollPolicy,
    publisher: &mut Publisher,
    session: &CancellationToken,
) -> Result<(), ChannelClosed> {
    info!("Entering demo mode");
    publisher.clear().await?;
    publisher.state(ConnectionState::Demo).await?;

    let mut demo = DemoSource::new();
    demo.start();
    let mut ticker = interval_at(Instant::now() + policy.demo_interval, policy.demo_interval);

    loop {
        tokio::select! {
            _ = session.cancelled() => {
                demo.stop();
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        if let Some(sample) = demo.read_sample() {
            publisher.sample(sample).await?;
        }
    }
}

async fn poll_host<S: TelemetrySource>(
    source: &S,
    host: IpAddr,
    policy: &PollPolicy,
    publisher: &mut Publisher,
    session: &CancellationToken,
) -> Result<(), ChannelClosed> {
    info!(%host, "Polling telemetry server");
    publisher.clear().await?;
    publisher.state(ConnectionState::Polling).await?;

    loop {
        let outcome = tokio::select! {
            _ = session.cancelled() => return Ok(()),
            outcome = fetch_with_timeout(source, host, policy.request_timeout) => outcome,
        };
        if session.is_cancelled() {
            return Ok(());
        }

        let decision = policy.decide(&outcome);
        match outcome {
            Ok(sample) => {
                publisher.sample(sample).await?;
                publisher.state(decision.state).await?;
            }
            Err(e) => {
                if e.is_timeout() {
                    debug!(%host, "{}", e);
                } else {
                    warn!(%host, "Telemetry poll failed: {}", e);
                }
                publisher.clear().await?;
                publisher.state(decision.state).await?;
            }
        }

        debug!(delay_ms = decision.delay.as_millis() as u64, "Next poll scheduled");
        tokio::select! {
            _ = session.cancelled() => return Ok(()),
            _ = sleep(decision.delay) => {}
        }
    }
}

async fn fetch_with_timeout<S: TelemetrySource>(
    source: &S,
    host: IpAddr,
    limit: Duration,
) -> Result<TelemetrySample, FetchError> {
    match tokio::time::timeout(limit, source.fetch(host)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit)),
    }
}

#[derive(Debug)]
struct ChannelClosed;

/// Outgoing event channel, shared by every session
///
/// Suppresses repeated connection states and clears of a sample that was
/// never published. Callers publish a sample before reporting `Connected`
/// and clear it before reporting `Disconnected`, so a consumer applying
/// events one at a time never sees `Connected` without a sample or
/// `Disconnected` with one.
struct Publisher {
    tx: mpsc::Sender<ClientEvent>,
    state: ConnectionState,
    exposed: bool,
}

impl Publisher {
    fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self {
            tx,
            state: ConnectionState::Idle,
            exposed: false,
        }
    }

    async fn state(&mut self, state: ConnectionState) -> Result<(), ChannelClosed> {
        if state == self.state {
            return Ok(());
        }
        info!(from = %self.state, to = %state, "Connection state changed");
        self.send(ClientEvent::Connection(state)).await?;
        self.state = state;
        Ok(())
    }

    async fn sample(&mut self, sample: TelemetrySample) -> Result<(), ChannelClosed> {
        self.send(ClientEvent::Sample(sample)).await?;
        self.exposed = true;
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), ChannelClosed> {
        if !self.exposed {
            return Ok(());
        }
        self.send(ClientEvent::SampleCleared).await?;
        self.exposed = false;
        Ok(())
    }

    async fn send(&self, event: ClientEvent) -> Result<(), ChannelClosed> {
        self.tx.send(event).await.map_err(|_| ChannelClosed)
    }
}
