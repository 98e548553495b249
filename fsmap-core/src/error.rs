//! Error types for fetching telemetry and editing the route

use crate::route::WaypointId;
use std::time::Duration;
use thiserror::Error;

/// Why a telemetry fetch produced no sample
///
/// Every variant is recoverable: the client clears the exposed sample,
/// reports `Disconnected` and retries on the slow interval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Address is not an IPv4/IPv6 literal; no request was made
    #[error("Invalid server address: {0:?}")]
    InvalidAddress(String),

    /// No response within the request timeout
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Transport-level failure (refused, unreachable, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with something other than 200
    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// Body was not JSON or lacked required fields
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Rejected route edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Waypoints can only be placed while a live position exists
    #[error("No live position available")]
    NoLivePosition,

    #[error("Waypoint {0} does not exist")]
    UnknownWaypoint(WaypointId),
}
