//! Telemetry source trait definition

use crate::error::FetchError;
use crate::model::TelemetrySample;
use std::future::Future;
use std::net::IpAddr;

/// Something that can fetch one telemetry sample from a companion server
///
/// Implementations perform a single attempt per call and never retry; the
/// retry and backoff policy belongs to the caller. The caller also enforces
/// the request timeout and may drop the returned future at any point to
/// abort the request.
pub trait TelemetrySource: Send + Sync {
    /// Short name for logs (e.g. "http")
    fn name(&self) -> &str;

    /// Fetch the current sample from `host`
    fn fetch(&self, host: IpAddr) -> impl Future<Output = Result<TelemetrySample, FetchError>> + Send;
}
