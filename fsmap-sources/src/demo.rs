//! Demo source that synthesises telemetry without a companion server
//!
//! Starts from a fixed position over Corsica and drifts north-east linearly
//! with elapsed time, so a user can try the map without a simulator running.

use fsmap_core::model::{TelemetrySample, WireSample};
use std::time::Duration;
use tokio::time::Instant;

/// Where the demo aircraft starts
pub const DEMO_BASE: WireSample = WireSample {
    lat: 42.532219,
    lon: 9.7364273,
    head: 45.0,
    speed: 172.21,
    alt: 3212.39,
};

/// Degrees of latitude and longitude added per elapsed millisecond
const DRIFT_PER_MS: f64 = 0.00001;

pub struct DemoSource {
    base: WireSample,
    start_time: Option<Instant>,
}

impl DemoSource {
    pub fn new() -> Self {
        Self {
            base: DEMO_BASE,
            start_time: None,
        }
    }

    /// Begin a walk from the base position
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn stop(&mut self) {
        self.start_time = None;
    }

    pub fn is_active(&self) -> bool {
        self.start_time.is_some()
    }

    /// Sample for the current instant, or `None` if not started
    pub fn read_sample(&self) -> Option<TelemetrySample> {
        let elapsed = self.start_time?.elapsed();
        Some(self.sample_at(elapsed))
    }

    /// Position after `elapsed` of flight from the base
    pub fn sample_at(&self, elapsed: Duration) -> TelemetrySample {
        let drift = elapsed.as_secs_f64() * 1000.0 * DRIFT_PER_MS;
        TelemetrySample::new(
            self.base.lat + drift,
            self.base.lon + drift,
            self.base.head,
            self.base.speed,
            self.base.alt,
        )
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}
