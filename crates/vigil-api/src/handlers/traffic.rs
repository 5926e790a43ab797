//! /rooms/{room}/stats and /rooms/{room}/traffic handlers: byte accounting.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use vigil_core::error::byte_count;
use vigil_core::MonitorError;
use vigil_services::{PeerTraffic, RoomTrafficReport, TrafficTotals};

use super::{api_error, ApiError, ApiState};

// ── /rooms/{room}/stats (POST, DELETE) ───────────────────────────────────────

pub async fn handle_stats_create(
    State(state): State<ApiState>,
    Path(room): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.directory.stats_create(&room).map_err(api_error)?;
    Ok(StatusCode::CREATED)
}

pub async fn handle_stats_destroy(
    State(state): State<ApiState>,
    Path(room): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.directory.stats_destroy(&room).map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── /rooms/{room}/traffic (POST) ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TrafficRecordRequest {
    pub peer_id: String,
    /// Signed so a negative count reaches validation instead of failing to parse.
    pub bytes_in: Option<i64>,
    pub bytes_out: Option<i64>,
}

pub async fn handle_traffic_record(
    State(state): State<ApiState>,
    Path(room): Path<String>,
    Json(req): Json<TrafficRecordRequest>,
) -> Result<Json<PeerTraffic>, ApiError> {
    // Validate both counts before recording either.
    let bytes_in = req.bytes_in.map(byte_count).transpose().map_err(api_error)?;
    let bytes_out = req.bytes_out.map(byte_count).transpose().map_err(api_error)?;
    if bytes_in.is_none() && bytes_out.is_none() {
        return Err(api_error(MonitorError::InvalidArgument(
            "bytes_in or bytes_out is required".to_string(),
        )));
    }

    // Both counts land on the same ledger even if the room goes away meanwhile.
    let ledger = state
        .directory
        .room(&room)
        .and_then(|r| r.ledger())
        .map_err(api_error)?;
    if let Some(n) = bytes_in {
        ledger.add_bytes_in(&req.peer_id, n).map_err(api_error)?;
    }
    if let Some(n) = bytes_out {
        ledger.add_bytes_out(&req.peer_id, n).map_err(api_error)?;
    }

    let traffic = ledger
        .snapshot()
        .remove(&req.peer_id)
        .ok_or_else(|| api_error(MonitorError::PeerNotFound(req.peer_id.clone())))?;
    Ok(Json(traffic))
}

// ── /rooms/{room}/traffic/lost (POST) ────────────────────────────────────────

#[derive(Deserialize)]
pub struct PacketLostRequest {
    /// Defaults to one.
    pub count: Option<u32>,
}

pub async fn handle_traffic_lost(
    State(state): State<ApiState>,
    Path(room): Path<String>,
    Json(req): Json<PacketLostRequest>,
) -> Result<Json<TrafficTotals>, ApiError> {
    let count = req.count.unwrap_or(1);
    state
        .directory
        .add_packets_lost(&room, u64::from(count))
        .map_err(api_error)?;
    let report = state.directory.traffic_report(&room).map_err(api_error)?;
    Ok(Json(report.totals))
}

// ── /rooms/{room}/traffic (GET) ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct TrafficSnapshotResponse {
    pub room_id: String,
    pub peers: HashMap<String, PeerTraffic>,
}

pub async fn handle_traffic_snapshot(
    State(state): State<ApiState>,
    Path(room): Path<String>,
) -> Result<Json<TrafficSnapshotResponse>, ApiError> {
    let peers = state.directory.snapshot(&room).map_err(api_error)?;
    Ok(Json(TrafficSnapshotResponse {
        room_id: room,
        peers,
    }))
}

// ── /rooms/{room}/traffic/report (GET) ───────────────────────────────────────

/// Refreshes bitrates, then reports.
pub async fn handle_traffic_report(
    State(state): State<ApiState>,
    Path(room): Path<String>,
) -> Result<Json<RoomTrafficReport>, ApiError> {
    state
        .directory
        .calculate_bitrates(&room)
        .map_err(api_error)?;
    let report = state.directory.traffic_report(&room).map_err(api_error)?;
    Ok(Json(report))
}

// ── /rooms/{room}/traffic/{peer} (DELETE) ────────────────────────────────────

pub async fn handle_traffic_peer_remove(
    State(state): State<ApiState>,
    Path((room, peer)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .directory
        .remove_traffic_peer(&room, &peer)
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}
