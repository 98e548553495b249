//! REST API and SSE routes

use crate::settings::SettingsError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post, put},
    Json, Router,
};
use fsmap_core::session::SessionSnapshot;
use fsmap_core::{Coordinate, MapStyle, RouteError, ServerAddress, WaypointId};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/events", get(event_stream))
        .route("/api/address", get(get_address).put(put_address))
        .route("/api/waypoints", post(add_waypoint))
        .route(
            "/api/waypoints/:id",
            put(move_waypoint).delete(remove_waypoint),
        )
        .route("/api/route/cursor", post(step_cursor))
        .route("/api/view/pan", post(user_pan))
        .route("/api/view/follow", put(set_follow))
        .route("/api/view/heading-lock", put(set_heading_lock))
        .route("/api/view/zoom", post(zoom))
        .route("/api/view/map-style", post(toggle_map_style))
        .route("/api/teleport", post(teleport))
        .route("/api/marker-style", post(cycle_marker_style))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn settings_error(e: SettingsError) -> ApiError {
    tracing::error!("Settings store failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Run a settings write on the blocking pool; it touches the disk
async fn blocking_settings<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, SettingsError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            tracing::error!("Settings task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .map_err(settings_error)
}

fn route_error(e: RouteError) -> ApiError {
    let status = match e {
        RouteError::NoLivePosition => StatusCode::CONFLICT,
        RouteError::UnknownWaypoint(_) => StatusCode::NOT_FOUND,
    };
    (status, e.to_string())
}

// === Session State ===

#[derive(Serialize)]
struct StateResponse {
    address: String,
    marker_style: usize,
    #[serde(flatten)]
    session: SessionSnapshot,
}

async fn get_state(State(state): State<AppState>) -> Result<Json<StateResponse>, ApiError> {
    let marker_style = state.settings.marker_style().map_err(settings_error)?;
    let session = state.session.read().await.snapshot();

    Ok(Json(StateResponse {
        address: state.address(),
        marker_style,
        session,
    }))
}

async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                Ok(sse) => Some(Ok(sse)),
                Err(e) => {
                    tracing::error!("Failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Broadcast stream error: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === Server Address ===

#[derive(Serialize)]
struct AddressResponse {
    address: String,
    parsed: ServerAddress,
}

impl AddressResponse {
    fn from_state(state: &AppState) -> Self {
        Self {
            address: state.address(),
            parsed: state.server_address(),
        }
    }
}

#[derive(Deserialize)]
struct AddressRequest {
    address: String,
}

async fn get_address(State(state): State<AppState>) -> Json<AddressResponse> {
    Json(AddressResponse::from_state(&state))
}

async fn put_address(
    State(state): State<AppState>,
    Json(request): Json<AddressRequest>,
) -> Result<Json<AddressResponse>, ApiError> {
    let writer = state.clone();
    blocking_settings(move || writer.set_address(&request.address)).await?;
    Ok(Json(AddressResponse::from_state(&state)))
}

// === Route Editing ===

async fn add_waypoint(
    State(state): State<AppState>,
    Json(coordinate): Json<Coordinate>,
) -> Result<impl IntoResponse, ApiError> {
    let added = state
        .with_session(|session| session.add_waypoint(coordinate))
        .await
        .map_err(route_error)?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn move_waypoint(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(coordinate): Json<Coordinate>,
) -> Result<StatusCode, ApiError> {
    state
        .with_session(|session| session.move_waypoint(WaypointId(id), coordinate))
        .await
        .map_err(route_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_waypoint(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state
        .with_session(|session| session.remove_waypoint(WaypointId(id)))
        .await
        .map_err(route_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum CursorDirection {
    Next,
    Previous,
}

#[derive(Deserialize)]
struct CursorRequest {
    direction: CursorDirection,
}

#[derive(Serialize)]
struct CursorResponse {
    cursor: usize,
}

async fn step_cursor(
    State(state): State<AppState>,
    Json(request): Json<CursorRequest>,
) -> Json<CursorResponse> {
    let cursor = state
        .with_session(|session| match request.direction {
            CursorDirection::Next => session.advance_cursor(),
            CursorDirection::Previous => session.retreat_cursor(),
        })
        .await;
    Json(CursorResponse { cursor })
}

// === Camera ===

#[derive(Deserialize)]
struct ToggleRequest {
    enabled: bool,
}

async fn user_pan(State(state): State<AppState>) -> StatusCode {
    state.with_session(|session| session.user_pan()).await;
    StatusCode::NO_CONTENT
}

async fn set_follow(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> StatusCode {
    state
        .with_session(|session| session.set_follow_enabled(request.enabled))
        .await;
    StatusCode::NO_CONTENT
}

async fn set_heading_lock(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> StatusCode {
    state
        .with_session(|session| session.set_heading_lock_enabled(request.enabled))
        .await;
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ZoomDirection {
    In,
    Out,
}

#[derive(Deserialize)]
struct ZoomRequest {
    direction: ZoomDirection,
}

async fn zoom(State(state): State<AppState>, Json(request): Json<ZoomRequest>) -> StatusCode {
    state
        .with_session(|session| match request.direction {
            ZoomDirection::In => session.zoom_in(),
            ZoomDirection::Out => session.zoom_out(),
        })
        .await;
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct MapStyleResponse {
    map_style: MapStyle,
}

async fn toggle_map_style(State(state): State<AppState>) -> Json<MapStyleResponse> {
    let map_style = state
        .with_session(|session| session.toggle_map_style())
        .await;
    Json(MapStyleResponse { map_style })
}

// === Teleport and Marker Style ===

async fn teleport(
    State(state): State<AppState>,
    Json(target): Json<Coordinate>,
) -> Result<StatusCode, ApiError> {
    state
        .teleport
        .send(&state.server_address(), target)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Serialize)]
struct MarkerStyleResponse {
    marker_style: usize,
}

async fn cycle_marker_style(
    State(state): State<AppState>,
) -> Result<Json<MarkerStyleResponse>, ApiError> {
    let settings = state.settings.clone();
    let marker_style = blocking_settings(move || settings.cycle_marker_style()).await?;
    Ok(Json(MarkerStyleResponse { marker_style }))
}
