//! Integration tests for HttpSource and TeleportCommand against a local
//! stand-in for the companion server

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fsmap_core::{Coordinate, FetchError, ServerAddress, TelemetrySource};
use fsmap_sources::{HttpSource, TeleportCommand};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;

/// Helper: serve a router on an ephemeral localhost port
async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Helper: a localhost port with nothing listening on it
async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[tokio::test]
async fn test_fetch_parses_data_endpoint() {
    let router = Router::new().route(
        "/data",
        get(|| async {
            Json(serde_json::json!({
                "lat": 10.0, "lon": 20.0, "head": 90.0, "speed": 100.0, "alt": 1000.0
            }))
        }),
    );
    let addr = serve(router).await;

    let source = HttpSource::new(addr.port());
    let sample = source.fetch(addr.ip()).await.unwrap();

    assert_eq!(sample.latitude, 10.0);
    assert_eq!(sample.longitude, 20.0);
    assert_eq!(sample.heading_degrees, 90.0);
    assert_eq!(sample.speed, 100.0);
    assert_eq!(sample.altitude, 1000.0);
}

#[tokio::test]
async fn test_fetch_non_200_is_unexpected_status() {
    let router = Router::new().route("/data", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let addr = serve(router).await;

    let result = HttpSource::new(addr.port()).fetch(addr.ip()).await;
    assert_eq!(result, Err(FetchError::UnexpectedStatus(503)));
}

#[tokio::test]
async fn test_fetch_non_json_is_malformed() {
    let router = Router::new().route("/data", get(|| async { "simulator not running" }));
    let addr = serve(router).await;

    let result = HttpSource::new(addr.port()).fetch(addr.ip()).await;
    assert!(
        matches!(result, Err(FetchError::MalformedResponse(_))),
        "got {:?}",
        result
    );
}

#[tokio::test]
async fn test_fetch_missing_field_is_malformed() {
    let router = Router::new().route(
        "/data",
        get(|| async { Json(serde_json::json!({"lat": 1.0, "lon": 2.0})) }),
    );
    let addr = serve(router).await;

    let result = HttpSource::new(addr.port()).fetch(addr.ip()).await;
    match result {
        Err(FetchError::MalformedResponse(msg)) => assert!(msg.contains("head"), "{}", msg),
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_connection_refused_is_network_error() {
    let addr = closed_port().await;

    let result = HttpSource::new(addr.port()).fetch(addr.ip()).await;
    assert!(
        matches!(result, Err(FetchError::Network(_))),
        "got {:?}",
        result
    );
}

#[tokio::test]
async fn test_teleport_posts_coordinate() {
    let (tx, mut rx) = mpsc::channel::<serde_json::Value>(1);
    let router = Router::new().route(
        "/teleport",
        post(move |Json(body): Json<serde_json::Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(body).await;
                StatusCode::OK
            }
        }),
    );
    let addr = serve(router).await;

    let command = TeleportCommand::new(addr.port());
    command
        .send(&ServerAddress::Host(addr.ip()), Coordinate::new(47.5, 8.25))
        .unwrap();

    let body = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("teleport should arrive")
        .unwrap();
    assert_eq!(body["latitude"], 47.5);
    assert_eq!(body["longitude"], 8.25);
}

#[tokio::test]
async fn test_teleport_to_unreachable_host_does_not_fail_caller() {
    let addr = closed_port().await;
    let command = TeleportCommand::new(addr.port());
    assert!(command
        .send(&ServerAddress::Host(addr.ip()), Coordinate::new(0.0, 0.0))
        .is_ok());
}

#[tokio::test]
async fn test_teleport_refuses_demo_and_unconfigured_addresses() {
    let command = TeleportCommand::new(12345);

    assert!(matches!(
        command.send(&ServerAddress::Demo, Coordinate::new(0.0, 0.0)),
        Err(FetchError::InvalidAddress(_))
    ));
    assert!(matches!(
        command.send(&ServerAddress::parse("not an ip"), Coordinate::new(0.0, 0.0)),
        Err(FetchError::InvalidAddress(_))
    ));
}
