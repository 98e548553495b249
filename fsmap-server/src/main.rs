//! FS Map Tool Server
//!
//! Polls the companion telemetry server and serves the live map state over a
//! REST and SSE API

use anyhow::{Context, Result};
use fsmap_server::settings::{JsonFileStore, Settings};
use fsmap_server::{api, manager, AppState, Config, TelemetryClient};
use fsmap_sources::HttpSource;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Pending client events before the poller waits on the manager
const EVENT_QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting FS Map Tool Server");

    let config = Config::from_env()?;
    let store = JsonFileStore::open(&config.settings_path).with_context(|| {
        format!("Failed to open settings at {}", config.settings_path.display())
    })?;
    info!("Settings loaded from {}", store.path().display());

    let settings = Settings::new(store);
    let version = env!("CARGO_PKG_VERSION");
    if settings.acknowledge_version(version)? {
        info!(version, "First run of this version");
    }

    // Create application state
    let state = AppState::new(settings, config.telemetry_port);
    if let Some(address) = &config.address {
        state.set_address(address)?;
    }

    // Start the telemetry client and the manager that applies its events
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let client = TelemetryClient::spawn(
        HttpSource::new(config.telemetry_port),
        config.policy,
        state.address_receiver(),
        events_tx,
    );
    tokio::spawn(manager::run(state.clone(), events_rx));

    // Build the router
    let app = api::create_router(state);

    // Start server
    info!("Server listening on http://{}", config.listen);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    client.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested");
}
