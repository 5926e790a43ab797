//! /rooms handlers: room lifecycle and keepalive control.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use vigil_services::RoomSummary;

use super::{api_error, ApiError, ApiState};

// ── /rooms (GET) ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummary>,
}

pub async fn handle_room_list(State(state): State<ApiState>) -> Json<RoomListResponse> {
    Json(RoomListResponse {
        rooms: state.directory.list_rooms(),
    })
}

// ── /rooms (POST) ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub room_id: String,
    /// Non-positive or absent selects the configured default.
    pub ping_interval_ms: Option<i64>,
    pub timeout_ms: Option<i64>,
}

pub async fn handle_room_create(
    State(state): State<ApiState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomSummary>), ApiError> {
    let config = state
        .keepalive
        .resolve(req.ping_interval_ms, req.timeout_ms);
    let room = state
        .directory
        .create_room(&req.room_id, config)
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(room.summary())))
}

// ── /rooms/{room} (DELETE) ────────────────────────────────────────────────────

pub async fn handle_room_destroy(
    State(state): State<ApiState>,
    Path(room): Path<String>,
) -> Result<StatusCode, ApiError> {
    // Closing the room waits out a tick in flight.
    let directory = state.directory.clone();
    tokio::task::spawn_blocking(move || directory.destroy_room(&room))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── /rooms/{room}/keepalive/{start,stop} (POST) ──────────────────────────────

pub async fn handle_keepalive_start(
    State(state): State<ApiState>,
    Path(room): Path<String>,
) -> Result<Json<RoomSummary>, ApiError> {
    state.directory.start(&room).map_err(api_error)?;
    let summary = state.directory.room(&room).map_err(api_error)?.summary();
    Ok(Json(summary))
}

pub async fn handle_keepalive_stop(
    State(state): State<ApiState>,
    Path(room): Path<String>,
) -> Result<Json<RoomSummary>, ApiError> {
    // Stop waits out a tick in flight; keep that off the async workers.
    let directory = state.directory.clone();
    let target = room.clone();
    tokio::task::spawn_blocking(move || directory.stop(&target))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(api_error)?;
    let summary = state.directory.room(&room).map_err(api_error)?.summary();
    Ok(Json(summary))
}

// ── /daemon/shutdown (POST) ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    if state.shutdown_tx.send(()).is_err() {
        tracing::warn!("no shutdown listener; daemon keeps running");
    }
    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}
