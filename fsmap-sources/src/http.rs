//! Companion server HTTP source
//!
//! One `GET http://{host}:{port}/data` per fetch. A 200 response whose body
//! parses as `{lat, lon, head, speed, alt}` is a sample; anything else is a
//! [`FetchError`]. The request timeout is enforced by the caller, which drops
//! the future to abort the request.

use fsmap_core::address::endpoint_url;
use fsmap_core::{FetchError, TelemetrySample, TelemetrySource};
use reqwest::StatusCode;
use std::net::IpAddr;

pub struct HttpSource {
    /// Reusable HTTP client with connection pooling
    client: reqwest::Client,
    port: u16,
}

impl HttpSource {
    pub fn new(port: u16) -> Self {
        Self::with_client(reqwest::Client::new(), port)
    }

    pub fn with_client(client: reqwest::Client, port: u16) -> Self {
        Self { client, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn data_url(&self, host: IpAddr) -> String {
        endpoint_url(host, self.port, "/data")
    }
}

impl TelemetrySource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, host: IpAddr) -> Result<TelemetrySample, FetchError> {
        let url = self.data_url(host);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let sample = TelemetrySample::from_json(&body)
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        tracing::trace!(
            url = %url,
            lat = sample.latitude,
            lon = sample.longitude,
            "Telemetry sample fetched"
        );

        Ok(sample)
    }
}
