//! Traffic ledger: per-room, per-peer byte and packet counters.
//!
//! Counters are plain atomics so data-plane callers never block each other.
//! The map itself is a DashMap: recording against an existing peer takes a
//! shard read lock, the first record for a peer takes the shard write lock.
//! Bitrates are derived on demand from counter deltas.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use vigil_core::error::validate_id;
use vigil_core::{MonitorError, Result};

/// Bitrate refreshes closer together than this are skipped.
const MIN_RATE_WINDOW_MS: u128 = 100;

// ── Counters ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Counters {
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    packets_in: AtomicU64,
    packets_out: AtomicU64,
    rate: Mutex<RateWindow>,
}

impl Counters {
    fn new(now: Instant) -> Self {
        Self {
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            packets_in: AtomicU64::new(0),
            packets_out: AtomicU64::new(0),
            rate: Mutex::new(RateWindow::new(now)),
        }
    }

    fn record_in(&self, bytes: u64) {
        self.bytes_in.fetch_add(bytes, Ordering::Relaxed);
        self.packets_in.fetch_add(1, Ordering::Relaxed);
    }

    fn record_out(&self, bytes: u64) {
        self.bytes_out.fetch_add(bytes, Ordering::Relaxed);
        self.packets_out.fetch_add(1, Ordering::Relaxed);
    }

    fn refresh_rate(&self, now: Instant) {
        let bytes_in = self.bytes_in.load(Ordering::Relaxed);
        let bytes_out = self.bytes_out.load(Ordering::Relaxed);
        self.rate.lock().update(now, bytes_in, bytes_out);
    }

    fn snapshot(&self) -> PeerTraffic {
        let rate = self.rate.lock();
        PeerTraffic {
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            packets_in: self.packets_in.load(Ordering::Relaxed),
            packets_out: self.packets_out.load(Ordering::Relaxed),
            bitrate_in_bps: rate.in_bps,
            bitrate_out_bps: rate.out_bps,
        }
    }
}

/// Last bitrate computation: when it ran, the counters it saw, the result.
#[derive(Debug)]
struct RateWindow {
    last_calc: Instant,
    last_in: u64,
    last_out: u64,
    in_bps: f64,
    out_bps: f64,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            last_calc: now,
            last_in: 0,
            last_out: 0,
            in_bps: 0.0,
            out_bps: 0.0,
        }
    }

    fn update(&mut self, now: Instant, bytes_in: u64, bytes_out: u64) {
        let elapsed = now.saturating_duration_since(self.last_calc);
        if elapsed.as_millis() < MIN_RATE_WINDOW_MS {
            return;
        }
        let secs = elapsed.as_secs_f64();
        self.in_bps = bytes_in.saturating_sub(self.last_in) as f64 * 8.0 / secs;
        self.out_bps = bytes_out.saturating_sub(self.last_out) as f64 * 8.0 / secs;
        self.last_in = bytes_in;
        self.last_out = bytes_out;
        self.last_calc = now;
    }
}

// ── Snapshot types ────────────────────────────────────────────────────────────

/// One peer's counters at the moment of the read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerTraffic {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in: u64,
    pub packets_out: u64,
    pub bitrate_in_bps: f64,
    pub bitrate_out_bps: f64,
}

/// Room-wide aggregate across every record, including removed peers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficTotals {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in: u64,
    pub packets_out: u64,
    pub packets_lost: u64,
    pub bitrate_in_bps: f64,
    pub bitrate_out_bps: f64,
    pub loss_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomTrafficReport {
    pub room_id: String,
    pub totals: TrafficTotals,
    pub peers: HashMap<String, PeerTraffic>,
    pub peer_count: usize,
    pub uptime_secs: f64,
}

// ── Ledger ────────────────────────────────────────────────────────────────────

pub struct RoomStats {
    room_id: String,
    started: Instant,
    peers: DashMap<String, Counters>,
    totals: Counters,
    packets_lost: AtomicU64,
}

impl RoomStats {
    pub fn new(room_id: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            room_id: room_id.into(),
            started: now,
            peers: DashMap::new(),
            totals: Counters::new(now),
            packets_lost: AtomicU64::new(0),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Count `bytes` received from `peer_id`. Creates the peer's entry on first use.
    pub fn add_bytes_in(&self, peer_id: &str, bytes: u64) -> Result<()> {
        validate_id("peer_id", peer_id)?;
        self.with_counters(peer_id, |c| c.record_in(bytes));
        self.totals.record_in(bytes);
        Ok(())
    }

    /// Count `bytes` sent to `peer_id`. Creates the peer's entry on first use.
    pub fn add_bytes_out(&self, peer_id: &str, bytes: u64) -> Result<()> {
        validate_id("peer_id", peer_id)?;
        self.with_counters(peer_id, |c| c.record_out(bytes));
        self.totals.record_out(bytes);
        Ok(())
    }

    pub fn add_packet_lost(&self) {
        self.add_packets_lost(1);
    }

    pub fn add_packets_lost(&self, count: u64) {
        self.packets_lost.fetch_add(count, Ordering::Relaxed);
    }

    /// Drop a peer's entry. Room totals keep what it contributed.
    pub fn remove_peer(&self, peer_id: &str) -> Result<()> {
        self.peers
            .remove(peer_id)
            .map(|_| ())
            .ok_or_else(|| MonitorError::PeerNotFound(peer_id.to_string()))
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn snapshot(&self) -> HashMap<String, PeerTraffic> {
        self.peers
            .iter()
            .map(|e| (e.key().clone(), e.value().snapshot()))
            .collect()
    }

    /// Lost packets over packets that should have arrived. Zero before any inbound packet.
    pub fn loss_rate(&self) -> f64 {
        let received = self.totals.packets_in.load(Ordering::Relaxed);
        if received == 0 {
            return 0.0;
        }
        let lost = self.packets_lost.load(Ordering::Relaxed);
        lost as f64 / (received + lost) as f64
    }

    pub fn totals(&self) -> TrafficTotals {
        let t = self.totals.snapshot();
        TrafficTotals {
            bytes_in: t.bytes_in,
            bytes_out: t.bytes_out,
            packets_in: t.packets_in,
            packets_out: t.packets_out,
            packets_lost: self.packets_lost.load(Ordering::Relaxed),
            bitrate_in_bps: t.bitrate_in_bps,
            bitrate_out_bps: t.bitrate_out_bps,
            loss_rate: self.loss_rate(),
        }
    }

    /// Refresh room and per-peer bitrates from counter deltas since the last refresh.
    pub fn calculate_bitrates(&self) {
        let now = Instant::now();
        self.totals.refresh_rate(now);
        for entry in self.peers.iter() {
            entry.value().refresh_rate(now);
        }
        tracing::trace!(room = %self.room_id, "bitrates refreshed");
    }

    pub fn report(&self) -> RoomTrafficReport {
        let peers = self.snapshot();
        RoomTrafficReport {
            room_id: self.room_id.clone(),
            totals: self.totals(),
            peer_count: peers.len(),
            peers,
            uptime_secs: self.started.elapsed().as_secs_f64(),
        }
    }

    fn with_counters(&self, peer_id: &str, f: impl FnOnce(&Counters)) {
        if let Some(counters) = self.peers.get(peer_id) {
            f(counters.value());
            return;
        }
        let counters = self
            .peers
            .entry(peer_id.to_string())
            .or_insert_with(|| Counters::new(Instant::now()));
        f(counters.value());
    }
}
