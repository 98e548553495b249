//! FS Map Tool Core Library
//!
//! Pure domain logic for the live map: the telemetry sample and its wire
//! shape, server-address classification, the poll scheduling policy, the
//! route model and the camera view state machine. Nothing in this crate does
//! I/O; sources and the async client live in `fsmap-sources` and
//! `fsmap-server`.

pub mod address;
pub mod error;
pub mod events;
pub mod hud;
pub mod model;
pub mod poll;
pub mod route;
pub mod session;
pub mod source;
pub mod view;

pub use address::{ServerAddress, DEFAULT_TELEMETRY_PORT, DEMO_SENTINEL};
pub use error::{FetchError, RouteError};
pub use events::{ClientEvent, MapEvent};
pub use model::{ConnectionState, Coordinate, TelemetrySample};
pub use poll::PollPolicy;
pub use route::{RouteModel, WaypointId};
pub use session::MapSession;
pub use source::TelemetrySource;
pub use view::{MapStyle, ViewController};
