//! Telemetry sources for FS Map Tool

pub mod demo;
pub mod http;
pub mod teleport;

pub use demo::DemoSource;
pub use http::HttpSource;
pub use teleport::TeleportCommand;
