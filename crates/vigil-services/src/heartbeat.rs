//! Per-peer heartbeat record: ping/pong timestamps, RTT, missed pongs,
//! and the status as of the last evaluation.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use vigil_core::PeerStatus;

/// Liveness state for one tracked peer.
///
/// Owned by the keepalive manager behind a per-peer lock. Every mutation
/// takes an explicit timestamp so callers with their own clock can drive it.
#[derive(Debug)]
pub struct PeerHeartbeat {
    peer_id: String,
    /// When tracking began. Stands in for the last pong until the first one.
    tracked_since: Instant,
    last_ping: Option<Instant>,
    last_pong: Option<Instant>,
    /// Latest RTT sample.
    rtt: Option<Duration>,
    /// Consecutive pings that went out while the previous one was unanswered.
    missed_pongs: u32,
    total_pings: u64,
    total_pongs: u64,
    /// Status committed by the last tick or pong. Events fire on changes to it.
    status: PeerStatus,
    /// Descriptive caller metadata (device, connection type, ...). Not interpreted.
    tags: BTreeMap<String, String>,
    /// Set when the peer is deregistered while a tick still holds the record.
    removed: bool,
}

impl PeerHeartbeat {
    pub fn new(peer_id: impl Into<String>, now: Instant) -> Self {
        Self {
            peer_id: peer_id.into(),
            tracked_since: now,
            last_ping: None,
            last_pong: None,
            rtt: None,
            missed_pongs: 0,
            total_pings: 0,
            total_pongs: 0,
            status: PeerStatus::Unknown,
            tags: BTreeMap::new(),
            removed: false,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Record that a ping went out at `at`.
    pub fn mark_ping_sent(&mut self, at: Instant) {
        if self.awaiting_pong() {
            self.missed_pongs = self.missed_pongs.saturating_add(1);
        }
        self.last_ping = Some(at);
        self.total_pings += 1;
    }

    /// Record a pong received at `at`. Returns the status before the pong.
    ///
    /// RTT is measured against the latest ping and clamps to zero when the
    /// ping timestamp lies after `at`.
    pub fn mark_pong_received(&mut self, at: Instant) -> PeerStatus {
        if let Some(ping) = self.last_ping {
            self.rtt = Some(at.saturating_duration_since(ping));
        }
        self.last_pong = Some(match self.last_pong {
            Some(prev) => prev.max(at),
            None => at,
        });
        self.missed_pongs = 0;
        self.total_pongs += 1;

        let previous = self.status;
        self.status = previous.on_pong();
        previous
    }

    /// Commit one timeout evaluation. Returns the new status if it changed.
    pub fn evaluate(&mut self, now: Instant, timeout: Duration) -> Option<PeerStatus> {
        let next = self.status.evaluate(self.silence(now), timeout);
        if next == self.status {
            return None;
        }
        self.status = next;
        Some(next)
    }

    /// Status a read at `now` observes, projected from the committed status
    /// against both thresholds. Nothing is committed.
    pub fn status_at(&self, now: Instant, timeout: Duration) -> PeerStatus {
        self.status.project(self.silence(now), timeout)
    }

    /// Time since the last pong, or since tracking began.
    pub fn silence(&self, now: Instant) -> Duration {
        let since = self.last_pong.unwrap_or(self.tracked_since);
        now.saturating_duration_since(since)
    }

    /// Committed status, as of the last tick or pong.
    pub fn status(&self) -> PeerStatus {
        self.status
    }

    pub fn rtt(&self) -> Option<Duration> {
        self.rtt
    }

    pub fn rtt_ms(&self) -> u64 {
        self.rtt.map(|d| d.as_millis() as u64).unwrap_or(0)
    }

    pub fn missed_pongs(&self) -> u32 {
        self.missed_pongs
    }

    pub fn set_tags(&mut self, tags: BTreeMap<String, String>) {
        self.tags = tags;
    }

    pub fn info(&self, now: Instant, timeout: Duration) -> PeerInfo {
        PeerInfo {
            peer_id: self.peer_id.clone(),
            status: self.status_at(now, timeout),
            rtt_ms: self.rtt.map(|d| d.as_millis() as u64),
            last_seen_ms: self
                .last_pong
                .map(|t| now.saturating_duration_since(t).as_millis() as u64),
            missed_pongs: self.missed_pongs,
            total_pings: self.total_pings,
            total_pongs: self.total_pongs,
            tags: self.tags.clone(),
        }
    }

    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.removed
    }

    fn awaiting_pong(&self) -> bool {
        match (self.last_ping, self.last_pong) {
            (Some(ping), Some(pong)) => pong < ping,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Point-in-time view of one peer's heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerInfo {
    pub peer_id: String,
    pub status: PeerStatus,
    /// Latest RTT sample. None until a pong follows a ping.
    pub rtt_ms: Option<u64>,
    /// Milliseconds since the last pong. None if the peer never answered.
    pub last_seen_ms: Option<u64>,
    pub missed_pongs: u32,
    pub total_pings: u64,
    pub total_pongs: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}
