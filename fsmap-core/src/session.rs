//! Map session: the single owner of route and view state
//!
//! Every telemetry event and user gesture goes through a [`MapSession`]
//! method. Each method updates the exposed sample, the [`RouteModel`] and the
//! [`ViewController`] together and queues the resulting [`MapEvent`]s, which
//! the caller collects with [`MapSession::take_events`].

use crate::error::RouteError;
use crate::events::{ClientEvent, MapEvent};
use crate::hud::HudReadout;
use crate::model::{ConnectionState, Coordinate, TelemetrySample};
use crate::route::{AddedWaypoint, RouteModel, RouteSnapshot, WaypointId};
use crate::view::{MapStyle, ViewController, ViewState};
use serde::Serialize;

/// Everything the presentation layer needs to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    pub sample: Option<TelemetrySample>,
    pub route: RouteSnapshot,
    pub view: ViewState,
    pub hud: HudReadout,
}

#[derive(Debug, Default)]
pub struct MapSession {
    connection: ConnectionState,
    sample: Option<TelemetrySample>,
    route: RouteModel,
    view: ViewController,
    outbox: Vec<MapEvent>,
}

impl MapSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn sample(&self) -> Option<&TelemetrySample> {
        self.sample.as_ref()
    }

    pub fn route(&self) -> &RouteModel {
        &self.route
    }

    pub fn view(&self) -> &ViewState {
        self.view.state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection: self.connection,
            sample: self.sample.clone(),
            route: self.route.snapshot(),
            view: *self.view.state(),
            hud: HudReadout::from_sample(self.sample.as_ref()),
        }
    }

    /// Drain events queued since the last call, oldest first
    pub fn take_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Apply one event from the telemetry client
    pub fn apply(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connection(state) => {
                if state != self.connection {
                    self.connection = state;
                    self.outbox.push(MapEvent::ConnectionChanged { state });
                }
            }
            ClientEvent::Sample(sample) => {
                self.route.recompute(Some(&sample));
                let view_changed = self.view.on_telemetry(&sample);
                self.sample = Some(sample.clone());

                self.outbox.push(MapEvent::SampleUpdated {
                    sample: Some(sample),
                });
                self.push_route_if_nonempty();
                if view_changed {
                    self.push_view();
                }
            }
            ClientEvent::SampleCleared => {
                if self.sample.is_none() {
                    return;
                }
                self.sample = None;
                self.route.recompute(None);
                self.view.on_telemetry_lost();

                self.outbox.push(MapEvent::SampleUpdated { sample: None });
                self.push_route_if_nonempty();
            }
        }
    }

    pub fn add_waypoint(&mut self, coordinate: Coordinate) -> Result<AddedWaypoint, RouteError> {
        let added = self.route.add_waypoint(coordinate)?;
        self.push_route();
        Ok(added)
    }

    pub fn move_waypoint(&mut self, id: WaypointId, coordinate: Coordinate) -> Result<(), RouteError> {
        self.route.move_waypoint(id, coordinate)?;
        self.push_route();
        Ok(())
    }

    /// Returns the remaining waypoint count
    pub fn remove_waypoint(&mut self, id: WaypointId) -> Result<usize, RouteError> {
        let count = self.route.remove_waypoint(id)?;
        self.push_route();
        Ok(count)
    }

    pub fn advance_cursor(&mut self) -> usize {
        let cursor = self.route.advance_cursor();
        self.push_route_if_nonempty();
        cursor
    }

    pub fn retreat_cursor(&mut self) -> usize {
        let cursor = self.route.retreat_cursor();
        self.push_route_if_nonempty();
        cursor
    }

    pub fn user_pan(&mut self) {
        if self.view.on_user_pan() {
            self.push_view();
        }
    }

    pub fn set_follow_enabled(&mut self, enabled: bool) {
        if self.view.set_follow_enabled(enabled) {
            self.push_view();
        }
    }

    pub fn set_heading_lock_enabled(&mut self, enabled: bool) {
        if self.view.set_heading_lock_enabled(enabled) {
            self.push_view();
        }
    }

    pub fn zoom_in(&mut self) {
        if self.view.zoom_in() {
            self.push_view();
        }
    }

    pub fn zoom_out(&mut self) {
        if self.view.zoom_out() {
            self.push_view();
        }
    }

    pub fn toggle_map_style(&mut self) -> MapStyle {
        let style = self.view.toggle_map_style();
        self.push_view();
        style
    }

    fn push_route(&mut self) {
        self.outbox.push(MapEvent::RouteChanged {
            route: self.route.snapshot(),
        });
    }

    fn push_route_if_nonempty(&mut self) {
        if !self.route.is_empty() {
            self.push_route();
        }
    }

    fn push_view(&mut self) {
        self.outbox.push(MapEvent::ViewChanged {
            view: *self.view.state(),
        });
    }
}
