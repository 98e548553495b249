//! Application state management

use crate::settings::{Settings, SettingsError};
use fsmap_core::{MapEvent, MapSession, ServerAddress, DEFAULT_TELEMETRY_PORT};
use fsmap_sources::TeleportCommand;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Route, view and latest sample
    pub session: Arc<RwLock<MapSession>>,

    /// Broadcast channel for session changes
    /// Multiple consumers can subscribe to receive events
    pub events_tx: broadcast::Sender<MapEvent>,

    /// Current server address; the telemetry client watches this
    pub address_tx: Arc<watch::Sender<String>>,

    pub settings: Arc<Settings>,

    pub teleport: TeleportCommand,
}

impl AppState {
    /// Build state with the persisted address as the initial one
    pub fn new(settings: Settings, telemetry_port: u16) -> Self {
        // Create broadcast channel with capacity for 100 events
        let (events_tx, _) = broadcast::channel(100);

        let address = settings.server_address().unwrap_or_else(|e| {
            warn!("Failed to read saved server address: {}", e);
            None
        });
        let (address_tx, _) = watch::channel(address.unwrap_or_default());

        Self {
            session: Arc::new(RwLock::new(MapSession::new())),
            events_tx,
            address_tx: Arc::new(address_tx),
            settings: Arc::new(settings),
            teleport: TeleportCommand::new(telemetry_port),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<MapEvent> {
        self.events_tx.subscribe()
    }

    pub fn address_receiver(&self) -> watch::Receiver<String> {
        self.address_tx.subscribe()
    }

    pub fn address(&self) -> String {
        self.address_tx.borrow().clone()
    }

    pub fn server_address(&self) -> ServerAddress {
        ServerAddress::parse(&self.address_tx.borrow())
    }

    /// Persist and publish a new server address
    ///
    /// Returns false if the address is unchanged, in which case the client
    /// keeps its current session.
    pub fn set_address(&self, address: &str) -> Result<bool, SettingsError> {
        let address = address.trim().to_string();
        self.settings.set_server_address(&address)?;

        let changed = self.address_tx.send_if_modified(|current| {
            if *current == address {
                return false;
            }
            *current = address.clone();
            true
        });
        if changed {
            info!(address = %address, "Server address set");
        }
        Ok(changed)
    }

    /// Run `f` against the session and broadcast the events it queued
    ///
    /// Events are sent before the lock is released so subscribers see them in
    /// the order the session produced them.
    pub async fn with_session<T>(&self, f: impl FnOnce(&mut MapSession) -> T) -> T {
        let mut session = self.session.write().await;
        let result = f(&mut session);
        for event in session.take_events() {
            // Ignore error if no receivers
            let _ = self.events_tx.send(event);
        }
        result
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Settings::in_memory(), DEFAULT_TELEMETRY_PORT)
    }
}
