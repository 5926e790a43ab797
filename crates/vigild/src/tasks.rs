//! Background daemon tasks: event logging and periodic bitrate refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use vigil_core::MonitorEvent;
use vigil_services::RoomDirectory;

pub const BITRATE_REFRESH: Duration = Duration::from_secs(1);

/// Drain engine events into the log until every sender is gone.
pub async fn event_logger(mut rx: mpsc::UnboundedReceiver<MonitorEvent>) {
    while let Some(event) = rx.recv().await {
        log_event(&event);
    }
    tracing::debug!("event channel closed");
}

fn log_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::Ping { room_id, peer_id } => {
            tracing::trace!(room = %room_id, peer = %peer_id, "ping");
        }
        MonitorEvent::PeerOnline { room_id, peer_id } => {
            tracing::info!(room = %room_id, peer = %peer_id, "peer online");
        }
        MonitorEvent::PeerSlow {
            room_id,
            peer_id,
            rtt_ms,
        } => {
            tracing::warn!(room = %room_id, peer = %peer_id, rtt_ms, "peer slow");
        }
        MonitorEvent::PeerOffline { room_id, peer_id } => {
            tracing::warn!(room = %room_id, peer = %peer_id, "peer offline");
        }
    }
}

/// Refresh every room's bitrates once per `period` until shutdown.
pub async fn bitrate_refresher(
    directory: Arc<RoomDirectory>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => refresh_all(&directory),
            _ = shutdown.recv() => return,
        }
    }
}

fn refresh_all(directory: &RoomDirectory) {
    for summary in directory.list_rooms() {
        if summary.ledger_peers.is_none() {
            continue;
        }
        // The room or its ledger may vanish between listing and refresh.
        if let Err(e) = directory.calculate_bitrates(&summary.room_id) {
            tracing::trace!(room = %summary.room_id, error = %e, "bitrate refresh skipped");
        }
    }
}
