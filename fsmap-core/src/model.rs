//! Live telemetry data model
//!
//! Defines the [`TelemetrySample`] every source converts to, the wire shape the
//! companion server speaks, and the client's [`ConnectionState`].
//!
//! Coordinates are WGS84 degrees. Heading is degrees true, normalised into
//! `[0, 360)`. Speed and altitude are passed through in whatever units the
//! simulator reports (knots and feet for the stock companion server).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the map
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One reported aircraft position/attitude/speed reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// When this sample was received (or synthesised)
    pub received_at: DateTime<Utc>,

    pub latitude: f64,
    pub longitude: f64,

    /// Heading in degrees, always in `[0, 360)`
    pub heading_degrees: f64,

    pub speed: f64,
    pub altitude: f64,
}

impl TelemetrySample {
    /// Build a sample stamped with the current time
    pub fn new(latitude: f64, longitude: f64, heading_degrees: f64, speed: f64, altitude: f64) -> Self {
        Self {
            received_at: Utc::now(),
            latitude,
            longitude,
            heading_degrees: normalize_heading(heading_degrees),
            speed,
            altitude,
        }
    }

    pub fn position(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Parse the companion server's `/data` body
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        let wire: WireSample = serde_json::from_slice(body)?;
        Ok(wire.into())
    }
}

/// Body of `GET /data` on the companion server
///
/// All five fields are required; anything else in the body is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireSample {
    pub lat: f64,
    pub lon: f64,
    pub head: f64,
    pub speed: f64,
    pub alt: f64,
}

impl From<WireSample> for TelemetrySample {
    fn from(wire: WireSample) -> Self {
        TelemetrySample::new(wire.lat, wire.lon, wire.head, wire.speed, wire.alt)
    }
}

impl From<&TelemetrySample> for WireSample {
    fn from(sample: &TelemetrySample) -> Self {
        Self {
            lat: sample.latitude,
            lon: sample.longitude,
            head: sample.heading_degrees,
            speed: sample.speed,
            alt: sample.altitude,
        }
    }
}

/// Wrap any heading into `[0, 360)`
pub fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Connectivity of the telemetry client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Client has not started its first session yet
    #[default]
    Idle,
    /// First request of an address session is in flight
    Polling,
    /// Last poll succeeded and a sample is exposed
    Connected,
    /// No valid address configured, or the last attempt failed
    Disconnected,
    /// Synthesising samples locally
    Demo,
}

impl ConnectionState {
    /// Whether samples are currently flowing
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connected | Self::Demo)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Polling => write!(f, "Polling"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Demo => write!(f, "Demo"),
        }
    }
}
