//! Camera follow and heading-lock state machine
//!
//! The view state is a pure function of the latest sample and two flags.
//! Heading lock implies follow: turning lock on forces follow on, and turning
//! follow off (directly or by panning the map) forces lock off.

use crate::model::{Coordinate, TelemetrySample};
use serde::{Deserialize, Serialize};

/// Visible map span in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomSpan {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Default for ZoomSpan {
    fn default() -> Self {
        Self {
            latitude_delta: 0.0922,
            longitude_delta: 0.0421,
        }
    }
}

/// Base map rendering; not persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStyle {
    #[default]
    Standard,
    Hybrid,
}

impl MapStyle {
    pub fn toggled(self) -> Self {
        match self {
            Self::Standard => Self::Hybrid,
            Self::Hybrid => Self::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub follow_enabled: bool,
    pub heading_lock_enabled: bool,
    /// Last position the camera was centred on, if any
    pub camera_center: Option<Coordinate>,
    /// 0 unless heading lock is on
    pub camera_heading: f64,
    pub zoom: ZoomSpan,
    pub map_style: MapStyle,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            follow_enabled: true,
            heading_lock_enabled: false,
            camera_center: None,
            camera_heading: 0.0,
            zoom: ZoomSpan::default(),
            map_style: MapStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewController {
    state: ViewState,
    last_sample: Option<TelemetrySample>,
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Apply a new sample. Returns true if the view changed.
    pub fn on_telemetry(&mut self, sample: &TelemetrySample) -> bool {
        self.last_sample = Some(sample.clone());
        self.update(|_| {})
    }

    /// Forget the last sample; the camera stays where it is
    pub fn on_telemetry_lost(&mut self) {
        self.last_sample = None;
    }

    /// Any manual map manipulation cancels auto-follow
    pub fn on_user_pan(&mut self) -> bool {
        self.set_follow_enabled(false)
    }

    pub fn set_follow_enabled(&mut self, enabled: bool) -> bool {
        self.update(|state| {
            state.follow_enabled = enabled;
            if !enabled {
                state.heading_lock_enabled = false;
            }
        })
    }

    pub fn set_heading_lock_enabled(&mut self, enabled: bool) -> bool {
        self.update(|state| {
            state.heading_lock_enabled = enabled;
            if enabled {
                state.follow_enabled = true;
            }
        })
    }

    pub fn zoom_in(&mut self) -> bool {
        self.update(|state| {
            state.zoom.latitude_delta /= 2.0;
            state.zoom.longitude_delta /= 2.0;
        })
    }

    pub fn zoom_out(&mut self) -> bool {
        self.update(|state| {
            state.zoom.latitude_delta *= 2.0;
            state.zoom.longitude_delta *= 2.0;
        })
    }

    /// Switch between standard and hybrid rendering
    pub fn toggle_map_style(&mut self) -> MapStyle {
        self.update(|state| state.map_style = state.map_style.toggled());
        self.state.map_style
    }

    /// Apply a flag change, then re-derive camera from flags and last sample
    fn update(&mut self, change: impl FnOnce(&mut ViewState)) -> bool {
        let before = self.state;
        change(&mut self.state);

        if self.state.heading_lock_enabled {
            self.state.follow_enabled = true;
        }

        self.state.camera_heading = match (&self.last_sample, self.state.heading_lock_enabled) {
            (Some(sample), true) => sample.heading_degrees,
            _ => 0.0,
        };
        if self.state.follow_enabled {
            if let Some(sample) = &self.last_sample {
                self.state.camera_center = Some(sample.position());
            }
        }

        self.state != before
    }
}
