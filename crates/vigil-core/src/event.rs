//! Events handed to the external notification surface.

use serde::{Deserialize, Serialize};

use crate::status::PeerStatus;

/// One liveness event. `Ping` fires once per tick per tracked peer and is
/// the signal collaborators use to put an actual ping on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    PeerOnline { room_id: String, peer_id: String },
    PeerSlow { room_id: String, peer_id: String, rtt_ms: u64 },
    PeerOffline { room_id: String, peer_id: String },
    Ping { room_id: String, peer_id: String },
}

impl MonitorEvent {
    /// Event announcing that a peer entered `status`.
    /// Returns None for `Unknown`, which is never a transition target.
    pub fn transition(room_id: &str, peer_id: &str, status: PeerStatus, rtt_ms: u64) -> Option<Self> {
        let room_id = room_id.to_string();
        let peer_id = peer_id.to_string();
        match status {
            PeerStatus::Online => Some(MonitorEvent::PeerOnline { room_id, peer_id }),
            PeerStatus::Slow => Some(MonitorEvent::PeerSlow {
                room_id,
                peer_id,
                rtt_ms,
            }),
            PeerStatus::Offline => Some(MonitorEvent::PeerOffline { room_id, peer_id }),
            PeerStatus::Unknown => None,
        }
    }

    pub fn ping(room_id: &str, peer_id: &str) -> Self {
        MonitorEvent::Ping {
            room_id: room_id.to_string(),
            peer_id: peer_id.to_string(),
        }
    }

    pub fn room_id(&self) -> &str {
        match self {
            MonitorEvent::PeerOnline { room_id, .. }
            | MonitorEvent::PeerSlow { room_id, .. }
            | MonitorEvent::PeerOffline { room_id, .. }
            | MonitorEvent::Ping { room_id, .. } => room_id,
        }
    }

    pub fn peer_id(&self) -> &str {
        match self {
            MonitorEvent::PeerOnline { peer_id, .. }
            | MonitorEvent::PeerSlow { peer_id, .. }
            | MonitorEvent::PeerOffline { peer_id, .. }
            | MonitorEvent::Ping { peer_id, .. } => peer_id,
        }
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorEvent::PeerOnline { .. } => "peer_online",
            MonitorEvent::PeerSlow { .. } => "peer_slow",
            MonitorEvent::PeerOffline { .. } => "peer_offline",
            MonitorEvent::Ping { .. } => "ping",
        }
    }
}
