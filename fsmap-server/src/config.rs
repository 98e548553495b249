//! Runtime configuration from environment variables

use anyhow::{Context, Result};
use fsmap_core::{PollPolicy, DEFAULT_TELEMETRY_PORT};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::settings::JsonFileStore;

pub const ENV_LISTEN: &str = "FSMAP_LISTEN";
pub const ENV_TELEMETRY_PORT: &str = "FSMAP_TELEMETRY_PORT";
pub const ENV_SETTINGS: &str = "FSMAP_SETTINGS";
pub const ENV_ADDRESS: &str = "FSMAP_ADDRESS";

/// Used when the platform has no config directory
const FALLBACK_SETTINGS_FILE: &str = "fsmap-settings.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the local API listens
    pub listen: SocketAddr,
    /// Port of the companion telemetry server
    pub telemetry_port: u16,
    pub settings_path: PathBuf,
    /// Overrides the saved server address at startup
    pub address: Option<String>,
    pub policy: PollPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 9100)),
            telemetry_port: DEFAULT_TELEMETRY_PORT,
            settings_path: JsonFileStore::default_path()
                .unwrap_or_else(|| PathBuf::from(FALLBACK_SETTINGS_FILE)),
            address: None,
            policy: PollPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset variables keep defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(listen) = lookup(ENV_LISTEN) {
            config.listen = listen
                .parse()
                .with_context(|| format!("Invalid {}: {:?}", ENV_LISTEN, listen))?;
        }
        if let Some(port) = lookup(ENV_TELEMETRY_PORT) {
            config.telemetry_port = port
                .parse()
                .with_context(|| format!("Invalid {}: {:?}", ENV_TELEMETRY_PORT, port))?;
        }
        if let Some(path) = lookup(ENV_SETTINGS) {
            config.settings_path = PathBuf::from(path);
        }
        config.address = lookup(ENV_ADDRESS).filter(|a| !a.trim().is_empty());

        Ok(config)
    }
}
