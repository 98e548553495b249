//! Fire-and-forget teleport command

use fsmap_core::address::endpoint_url;
use fsmap_core::{Coordinate, FetchError, ServerAddress};

/// Asks the companion server to move the aircraft
#[derive(Clone)]
pub struct TeleportCommand {
    client: reqwest::Client,
    port: u16,
}

impl TeleportCommand {
    pub fn new(port: u16) -> Self {
        Self {
            client: reqwest::Client::new(),
            port,
        }
    }

    /// POST `{latitude, longitude}` to `/teleport` without waiting for a reply
    ///
    /// Only fails synchronously when the address is not a pollable host.
    /// Must be called from within a tokio runtime.
    pub fn send(&self, address: &ServerAddress, target: Coordinate) -> Result<(), FetchError> {
        let host = match address {
            ServerAddress::Host(ip) => *ip,
            ServerAddress::Demo => {
                return Err(FetchError::InvalidAddress(fsmap_core::DEMO_SENTINEL.to_string()))
            }
            ServerAddress::Unconfigured(raw) => return Err(FetchError::InvalidAddress(raw.clone())),
        };

        let url = endpoint_url(host, self.port, "/teleport");
        let client = self.client.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&target).send().await {
                Ok(response) => {
                    tracing::debug!(url = %url, status = %response.status(), "Teleport sent");
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Teleport failed");
                }
            }
        });

        Ok(())
    }
}
