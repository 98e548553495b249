//! FS Map Tool Server Library
//!
//! The async telemetry client, the session manager that feeds it into the
//! route and view state, persisted settings and the local HTTP API.

pub mod api;
pub mod client;
pub mod config;
pub mod manager;
pub mod settings;
pub mod state;

pub use client::TelemetryClient;
pub use config::Config;
pub use state::AppState;
