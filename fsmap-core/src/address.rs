//! Companion server address classification

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Port the companion server listens on
pub const DEFAULT_TELEMETRY_PORT: u16 = 12345;

/// Address value that switches the client into demo mode
pub const DEMO_SENTINEL: &str = "99999";

/// What a user-entered address means to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ServerAddress {
    /// Empty or not a syntactically valid IPv4/IPv6 address
    Unconfigured(String),
    /// The demo sentinel
    Demo,
    /// A host that can be polled
    Host(IpAddr),
}

impl ServerAddress {
    /// Classify a raw address string
    ///
    /// Surrounding whitespace is ignored. Hostnames are not accepted.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == DEMO_SENTINEL {
            return Self::Demo;
        }
        match trimmed.parse::<IpAddr>() {
            Ok(ip) => Self::Host(ip),
            Err(_) => Self::Unconfigured(trimmed.to_string()),
        }
    }

    pub fn host(&self) -> Option<IpAddr> {
        match self {
            Self::Host(ip) => Some(*ip),
            _ => None,
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, Self::Demo)
    }
}

/// `http://{host}:{port}{path}`, with IPv6 hosts bracketed
pub fn endpoint_url(host: IpAddr, port: u16, path: &str) -> String {
    format!("http://{}{}", SocketAddr::new(host, port), path)
}
