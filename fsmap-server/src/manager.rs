//! Session manager
//!
//! Feeds events from the telemetry client into the shared [`MapSession`] and
//! broadcasts whatever the session emits in response.
//!
//! [`MapSession`]: fsmap_core::MapSession

use crate::state::AppState;
use fsmap_core::ClientEvent;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Main manager loop; returns when the client side of the channel closes
pub async fn run(state: AppState, mut events_rx: mpsc::Receiver<ClientEvent>) {
    info!("Session manager started");

    while let Some(event) = events_rx.recv().await {
        if let ClientEvent::Connection(connection) = &event {
            debug!(%connection, "Applying connection change");
        }
        state.with_session(|session| session.apply(event)).await;
    }

    info!("Session manager stopped");
}
