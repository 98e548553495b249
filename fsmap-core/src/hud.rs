//! Heads-up readout text

use crate::model::TelemetrySample;
use serde::Serialize;
use std::fmt;

pub const WAITING_TEXT: &str = "Waiting for server data...";

/// Values shown in the HUD strip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HudReadout {
    Waiting,
    Live {
        /// Zero-padded to three digits
        heading: String,
        speed: String,
        altitude: String,
    },
}

impl HudReadout {
    pub fn from_sample(sample: Option<&TelemetrySample>) -> Self {
        match sample {
            None => Self::Waiting,
            Some(sample) => Self::Live {
                heading: format!("{:03}", sample.heading_degrees.trunc() as i64),
                speed: format!("{}", sample.speed.trunc() as i64),
                altitude: format!("{}", sample.altitude.trunc() as i64),
            },
        }
    }
}

impl fmt::Display for HudReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str(WAITING_TEXT),
            Self::Live {
                heading,
                speed,
                altitude,
            } => write!(f, "Heading: {heading} Speed: {speed} Altitude: {altitude}"),
        }
    }
}
