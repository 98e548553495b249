//! Events flowing between the telemetry client, the session and the
//! presentation layer

use crate::model::{ConnectionState, TelemetrySample};
use crate::route::RouteSnapshot;
use crate::view::ViewState;
use serde::{Deserialize, Serialize};

/// Emitted by the telemetry client, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientEvent {
    /// Connection state changed
    Connection(ConnectionState),
    /// A new sample replaces the exposed one
    Sample(TelemetrySample),
    /// The exposed sample is no longer valid
    SampleCleared,
}

/// Observed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapEvent {
    SampleUpdated { sample: Option<TelemetrySample> },
    ConnectionChanged { state: ConnectionState },
    RouteChanged { route: RouteSnapshot },
    ViewChanged { view: ViewState },
}

impl MapEvent {
    /// Event name used for SSE `event:` lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::SampleUpdated { .. } => "sample_updated",
            Self::ConnectionChanged { .. } => "connection_changed",
            Self::RouteChanged { .. } => "route_changed",
            Self::ViewChanged { .. } => "view_changed",
        }
    }
}
