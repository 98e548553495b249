//! Route model
//!
//! An ordered list of user-placed waypoints, one segment per waypoint, and a
//! 1-based cursor naming the waypoint currently being flown to.
//!
//! Segment `i` runs from waypoint `i - 1` to waypoint `i`. The first segment
//! and the active segment (the one leading to the cursor) start at the live
//! aircraft position instead. Segment geometry, leg state and colour are
//! never edited directly; every mutation ends in [`RouteModel::recompute`].

use crate::error::RouteError;
use crate::model::{Coordinate, TelemetrySample};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable waypoint identifier, never reused within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaypointId(pub u64);

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress of a leg relative to the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegState {
    #[default]
    Upcoming,
    Active,
    Passed,
}

/// How the presentation layer should draw a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentColor {
    /// Active leg with live telemetry
    Highlight,
    /// Active leg while telemetry is not live
    Dimmed,
    /// Upcoming leg
    Normal,
    /// Passed leg, not drawn
    Transparent,
}

impl SegmentColor {
    /// Colour of a leg given its state and telemetry liveness
    pub fn for_leg(state: LegState, live: bool) -> Self {
        match state {
            LegState::Passed => Self::Transparent,
            LegState::Active if live => Self::Highlight,
            LegState::Active => Self::Dimmed,
            LegState::Upcoming => Self::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: WaypointId,
    pub coordinate: Coordinate,
    pub state: LegState,
}

/// Line leading to the co-indexed waypoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub waypoint_id: WaypointId,
    pub start: Coordinate,
    pub end: Coordinate,
    pub state: LegState,
    pub color: SegmentColor,
}

/// Result of a successful insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedWaypoint {
    pub id: WaypointId,
    /// Waypoint count after insertion
    pub count: usize,
    /// The route was empty before this insertion
    pub first: bool,
}

/// Serializable view of the whole route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSnapshot {
    pub waypoints: Vec<Waypoint>,
    pub segments: Vec<Segment>,
    pub cursor: usize,
    pub live: bool,
}

#[derive(Debug, Clone)]
pub struct RouteModel {
    waypoints: Vec<Waypoint>,
    segments: Vec<Segment>,
    /// 1-based, in `[1, max(1, len)]`
    cursor: usize,
    next_id: u64,
    /// Present only while telemetry is live
    live: Option<Coordinate>,
    /// Last live position ever seen
    anchor: Option<Coordinate>,
}

impl Default for RouteModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteModel {
    pub fn new() -> Self {
        Self {
            waypoints: Vec::new(),
            segments: Vec::new(),
            cursor: 1,
            next_id: 0,
            live: None,
            anchor: None,
        }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Current waypoint index, 1-based
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn waypoint(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.iter().find(|wp| wp.id == id)
    }

    /// Segment leading to the cursor, if the route is non-empty
    pub fn active_segment(&self) -> Option<&Segment> {
        self.segments.get(self.cursor - 1)
    }

    pub fn snapshot(&self) -> RouteSnapshot {
        RouteSnapshot {
            waypoints: self.waypoints.clone(),
            segments: self.segments.clone(),
            cursor: self.cursor,
            live: self.live.is_some(),
        }
    }

    /// Append a waypoint at the end of the route
    pub fn add_waypoint(&mut self, coordinate: Coordinate) -> Result<AddedWaypoint, RouteError> {
        let live = self.live.ok_or(RouteError::NoLivePosition)?;

        let id = WaypointId(self.next_id);
        self.next_id += 1;

        let start = self.waypoints.last().map(|wp| wp.coordinate).unwrap_or(live);
        self.waypoints.push(Waypoint {
            id,
            coordinate,
            state: LegState::Upcoming,
        });
        self.segments.push(Segment {
            waypoint_id: id,
            start,
            end: coordinate,
            state: LegState::Upcoming,
            color: SegmentColor::Normal,
        });
        self.recompute_segments();

        Ok(AddedWaypoint {
            id,
            count: self.waypoints.len(),
            first: self.waypoints.len() == 1,
        })
    }

    /// Move a waypoint without changing its id or position in the route
    pub fn move_waypoint(&mut self, id: WaypointId, coordinate: Coordinate) -> Result<(), RouteError> {
        let waypoint = self
            .waypoints
            .iter_mut()
            .find(|wp| wp.id == id)
            .ok_or(RouteError::UnknownWaypoint(id))?;
        waypoint.coordinate = coordinate;
        self.recompute_segments();
        Ok(())
    }

    /// Remove a waypoint and its segment, returning the new count
    ///
    /// Removing a waypoint before the cursor shifts the cursor back so it
    /// keeps naming the same waypoint; the cursor is then clamped into
    /// `[1, max(1, count)]`.
    pub fn remove_waypoint(&mut self, id: WaypointId) -> Result<usize, RouteError> {
        let index = self
            .waypoints
            .iter()
            .position(|wp| wp.id == id)
            .ok_or(RouteError::UnknownWaypoint(id))?;

        self.waypoints.remove(index);
        self.segments.remove(index);

        if index + 1 < self.cursor {
            self.cursor -= 1;
        }
        self.cursor = self.cursor.clamp(1, self.waypoints.len().max(1));
        self.recompute_segments();

        Ok(self.waypoints.len())
    }

    /// Step the cursor forward, wrapping from the last waypoint to the first
    pub fn advance_cursor(&mut self) -> usize {
        let count = self.waypoints.len();
        if count > 0 {
            self.cursor = if self.cursor >= count { 1 } else { self.cursor + 1 };
            self.recompute_segments();
        }
        self.cursor
    }

    /// Step the cursor back, wrapping from the first waypoint to the last
    pub fn retreat_cursor(&mut self) -> usize {
        let count = self.waypoints.len();
        if count > 0 {
            self.cursor = if self.cursor <= 1 { count } else { self.cursor - 1 };
            self.recompute_segments();
        }
        self.cursor
    }

    /// Re-derive every segment from the latest telemetry
    ///
    /// `None` means telemetry is not live: live-anchored segments keep their
    /// last anchor and the active leg is dimmed.
    pub fn recompute(&mut self, live: Option<&TelemetrySample>) {
        self.live = live.map(TelemetrySample::position);
        if self.live.is_some() {
            self.anchor = self.live;
        }
        self.recompute_segments();
    }

    fn recompute_segments(&mut self) {
        let live = self.live.is_some();

        for index in 0..self.waypoints.len() {
            let position = index + 1;
            let state = if position == self.cursor {
                LegState::Active
            } else if position < self.cursor {
                LegState::Passed
            } else {
                LegState::Upcoming
            };

            let end = self.waypoints[index].coordinate;
            let segment = &mut self.segments[index];
            if index == 0 || state == LegState::Active {
                if let Some(anchor) = self.anchor {
                    segment.start = anchor;
                }
            } else {
                segment.start = self.waypoints[index - 1].coordinate;
            }
            segment.end = end;
            segment.waypoint_id = self.waypoints[index].id;
            segment.state = state;
            segment.color = SegmentColor::for_leg(state, live);

            self.waypoints[index].state = state;
        }
    }
}
