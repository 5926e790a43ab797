//! Peer status: coarse liveness classification and its transition rules.
//!
//! Transitions:
//!   unknown → online    first pong
//!   unknown → slow      nothing heard for more than T since tracking began
//!   online  → slow      elapsed since last pong > T
//!   slow    → offline   elapsed since last pong > 2T
//!   slow    → online    any pong
//!   offline → online    any pong
//!
//! A single evaluation never moves online → offline. The thresholds are
//! checked in order against the previous status, so a peer that has been
//! silent for more than 2T while still marked online lands on slow first
//! and reaches offline on the next evaluation.
//!
//! Reads use `project` instead, which applies both thresholds at once so a
//! peer silent for more than 2T always reads offline.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    /// Tracked but never answered a ping.
    #[default]
    Unknown,
    Online,
    /// Missed at least one pong cycle beyond the timeout.
    Slow,
    Offline,
}

impl PeerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerStatus::Unknown => "unknown",
            PeerStatus::Online => "online",
            PeerStatus::Slow => "slow",
            PeerStatus::Offline => "offline",
        }
    }

    /// Status after a pong arrives. Recovery is immediate from any state.
    pub fn on_pong(self) -> PeerStatus {
        PeerStatus::Online
    }

    /// Status after one timeout evaluation.
    ///
    /// `elapsed` is measured from the last pong, or from when tracking
    /// began if the peer never answered.
    pub fn evaluate(self, elapsed: Duration, timeout: Duration) -> PeerStatus {
        let offline_after = timeout.saturating_mul(2);
        match self {
            PeerStatus::Unknown | PeerStatus::Online if elapsed > timeout => PeerStatus::Slow,
            PeerStatus::Slow if elapsed > offline_after => PeerStatus::Offline,
            other => other,
        }
    }

    /// Status a read observes after `elapsed` of silence, without a tick.
    ///
    /// Unlike `evaluate`, this applies the offline threshold from any state.
    pub fn project(self, elapsed: Duration, timeout: Duration) -> PeerStatus {
        if elapsed > timeout.saturating_mul(2) {
            return PeerStatus::Offline;
        }
        self.evaluate(elapsed, timeout)
    }
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
