//! /rooms/{room}/peers handlers: peer tracking, pongs, liveness queries.

use std::collections::{BTreeMap, HashMap};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use vigil_services::PeerInfo;

use super::{api_error, ApiError, ApiState};

// ── /rooms/{room}/peers (GET) ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PeerListResponse {
    pub room_id: String,
    pub peers: HashMap<String, PeerInfo>,
}

pub async fn handle_peer_list(
    State(state): State<ApiState>,
    Path(room): Path<String>,
) -> Result<Json<PeerListResponse>, ApiError> {
    let peers = state.directory.all_peer_info(&room).map_err(api_error)?;
    Ok(Json(PeerListResponse {
        room_id: room,
        peers,
    }))
}

// ── /rooms/{room}/peers (POST) ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AddPeerRequest {
    pub peer_id: String,
    /// Descriptive metadata (device, connection type). Stored, never interpreted.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

pub async fn handle_peer_add(
    State(state): State<ApiState>,
    Path(room): Path<String>,
    Json(req): Json<AddPeerRequest>,
) -> Result<(StatusCode, Json<PeerInfo>), ApiError> {
    let dir = &state.directory;
    dir.add_peer(&room, &req.peer_id).map_err(api_error)?;
    if !req.tags.is_empty() {
        dir.set_peer_tags(&room, &req.peer_id, req.tags)
            .map_err(api_error)?;
    }
    let info = dir.peer_info(&room, &req.peer_id).map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(info)))
}

// ── /rooms/{room}/peers/{peer} ────────────────────────────────────────────────

pub async fn handle_peer_inspect(
    State(state): State<ApiState>,
    Path((room, peer)): Path<(String, String)>,
) -> Result<Json<PeerInfo>, ApiError> {
    let info = state.directory.peer_info(&room, &peer).map_err(api_error)?;
    Ok(Json(info))
}

pub async fn handle_peer_remove(
    State(state): State<ApiState>,
    Path((room, peer)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .directory
        .remove_peer(&room, &peer)
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── /rooms/{room}/peers/{peer}/{ping,pong} (POST) ────────────────────────────

/// Record an out-of-cycle ping, e.g. one the transport sent on its own.
pub async fn handle_peer_ping(
    State(state): State<ApiState>,
    Path((room, peer)): Path<(String, String)>,
) -> Result<Json<PeerInfo>, ApiError> {
    let dir = &state.directory;
    dir.note_ping_sent(&room, &peer).map_err(api_error)?;
    Ok(Json(dir.peer_info(&room, &peer).map_err(api_error)?))
}

pub async fn handle_peer_pong(
    State(state): State<ApiState>,
    Path((room, peer)): Path<(String, String)>,
) -> Result<Json<PeerInfo>, ApiError> {
    let dir = &state.directory;
    dir.handle_pong(&room, &peer).map_err(api_error)?;
    Ok(Json(dir.peer_info(&room, &peer).map_err(api_error)?))
}
