//! Poll scheduling policy
//!
//! The decision of what state to report and how long to wait before the next
//! attempt is a pure function of the previous attempt's outcome, kept apart
//! from the async loop that acts on it.

use crate::error::FetchError;
use crate::model::ConnectionState;
use std::time::Duration;

/// Timing constants for the telemetry client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after a successful poll
    pub fast_interval: Duration,
    /// Delay after a failed poll, or between checks of an unusable address
    pub slow_interval: Duration,
    /// Upper bound on a single request
    pub request_timeout: Duration,
    /// Period of synthetic samples in demo mode
    pub demo_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            fast_interval: Duration::from_secs(1),
            slow_interval: Duration::from_secs(10),
            request_timeout: Duration::from_millis(3000),
            demo_interval: Duration::from_secs(1),
        }
    }
}

/// What to do after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollDecision {
    pub state: ConnectionState,
    pub delay: Duration,
}

impl PollPolicy {
    /// Decide from the outcome of a poll
    pub fn decide<T>(&self, outcome: &Result<T, FetchError>) -> PollDecision {
        match outcome {
            Ok(_) => PollDecision {
                state: ConnectionState::Connected,
                delay: self.fast_interval,
            },
            Err(_) => PollDecision {
                state: ConnectionState::Disconnected,
                delay: self.slow_interval,
            },
        }
    }

    /// Decision for an address that must not be polled at all
    pub fn unconfigured(&self) -> PollDecision {
        PollDecision {
            state: ConnectionState::Disconnected,
            delay: self.slow_interval,
        }
    }
}
