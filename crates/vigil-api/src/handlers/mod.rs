//! HTTP API handlers: exposes the room directory as JSON.

pub mod peers;
pub mod rooms;
pub mod traffic;

use std::sync::Arc;

use axum::http::StatusCode;

use vigil_core::config::KeepaliveSettings;
use vigil_core::MonitorError;
use vigil_services::RoomDirectory;

#[derive(Clone)]
pub struct ApiState {
    pub directory: Arc<RoomDirectory>,
    /// Timing for rooms created without explicit values.
    pub keepalive: KeepaliveSettings,
    /// Shutdown broadcast sender: signals graceful daemon shutdown.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

pub type ApiError = (StatusCode, String);

/// Map an engine error onto an HTTP status.
pub fn api_error(err: MonitorError) -> ApiError {
    let status = match &err {
        MonitorError::RoomNotFound(_)
        | MonitorError::PeerNotFound(_)
        | MonitorError::LedgerNotFound(_) => StatusCode::NOT_FOUND,
        MonitorError::AlreadyExists(_)
        | MonitorError::AlreadyTracked(_)
        | MonitorError::AlreadyRunning(_)
        | MonitorError::NotRunning(_)
        | MonitorError::LedgerExists(_) => StatusCode::CONFLICT,
        MonitorError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

// Re-export handler functions for use in router setup.
pub use peers::{
    handle_peer_add, handle_peer_inspect, handle_peer_list, handle_peer_ping, handle_peer_pong,
    handle_peer_remove,
};
pub use rooms::{
    handle_keepalive_start, handle_keepalive_stop, handle_room_create, handle_room_destroy,
    handle_room_list, handle_shutdown,
};
pub use traffic::{
    handle_stats_create, handle_stats_destroy, handle_traffic_lost, handle_traffic_peer_remove,
    handle_traffic_record, handle_traffic_report, handle_traffic_snapshot,
};
