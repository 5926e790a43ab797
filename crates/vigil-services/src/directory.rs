//! Room directory: process-wide map from room id to its monitoring pair.
//!
//! Every per-room operation resolves the room here first and fails with
//! `RoomNotFound` when it is absent. Destroying a room unlinks it before
//! tearing it down, so no new operation can reach a room being destroyed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::runtime::Handle;

use vigil_core::error::validate_id;
use vigil_core::{KeepaliveConfig, MonitorError, PeerStatus, Result};

use crate::heartbeat::PeerInfo;
use crate::keepalive::KeepaliveManager;
use crate::sink::EventSink;
use crate::stats::{PeerTraffic, RoomStats, RoomTrafficReport};

/// One room: its keepalive manager and its traffic ledger.
pub struct Room {
    id: String,
    keepalive: Arc<KeepaliveManager>,
    /// None after the ledger is destroyed on its own.
    ledger: RwLock<Option<Arc<RoomStats>>>,
}

impl Room {
    fn new(id: &str, config: KeepaliveConfig, sink: Arc<dyn EventSink>, runtime: Handle) -> Self {
        Self {
            id: id.to_string(),
            keepalive: Arc::new(KeepaliveManager::new(id, config, sink, runtime)),
            ledger: RwLock::new(Some(Arc::new(RoomStats::new(id)))),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn keepalive(&self) -> &Arc<KeepaliveManager> {
        &self.keepalive
    }

    pub fn ledger(&self) -> Result<Arc<RoomStats>> {
        self.ledger
            .read()
            .clone()
            .ok_or_else(|| MonitorError::LedgerNotFound(self.id.clone()))
    }

    pub fn summary(&self) -> RoomSummary {
        let config = self.keepalive.config();
        RoomSummary {
            room_id: self.id.clone(),
            running: self.keepalive.is_running(),
            tracked_peers: self.keepalive.peer_count(),
            ledger_peers: self.ledger.read().as_ref().map(|l| l.peer_count()),
            interval_ms: config.interval_ms(),
            timeout_ms: config.timeout_ms(),
        }
    }

    fn close(&self) {
        self.keepalive.close();
        self.ledger.write().take();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub running: bool,
    pub tracked_peers: usize,
    /// None when the room's ledger has been destroyed.
    pub ledger_peers: Option<usize>,
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

pub struct RoomDirectory {
    rooms: DashMap<String, Arc<Room>>,
    sink: Arc<dyn EventSink>,
    /// Runtime the keepalive timers are spawned on.
    runtime: Handle,
}

impl RoomDirectory {
    pub fn new(runtime: Handle, sink: Arc<dyn EventSink>) -> Self {
        Self {
            rooms: DashMap::new(),
            sink,
            runtime,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Create a room with a fresh keepalive manager and traffic ledger.
    pub fn create_room(&self, room_id: &str, config: KeepaliveConfig) -> Result<Arc<Room>> {
        validate_id("room_id", room_id)?;
        match self.rooms.entry(room_id.to_string()) {
            Entry::Occupied(_) => Err(MonitorError::AlreadyExists(room_id.to_string())),
            Entry::Vacant(slot) => {
                let room = Arc::new(Room::new(
                    room_id,
                    config,
                    self.sink.clone(),
                    self.runtime.clone(),
                ));
                slot.insert(room.clone());
                tracing::info!(
                    room = %room_id,
                    interval_ms = config.interval_ms(),
                    timeout_ms = config.timeout_ms(),
                    "room created"
                );
                Ok(room)
            }
        }
    }

    /// Stop the room's scheduler and release all of its state.
    pub fn destroy_room(&self, room_id: &str) -> Result<()> {
        let (_, room) = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| MonitorError::RoomNotFound(room_id.to_string()))?;
        room.close();
        tracing::info!(room = %room_id, "room destroyed");
        Ok(())
    }

    pub fn room(&self, room_id: &str) -> Result<Arc<Room>> {
        self.rooms
            .get(room_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| MonitorError::RoomNotFound(room_id.to_string()))
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Summaries of every live room, ordered by id.
    pub fn list_rooms(&self) -> Vec<RoomSummary> {
        let rooms: Vec<Arc<Room>> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut summaries: Vec<RoomSummary> = rooms.iter().map(|r| r.summary()).collect();
        summaries.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        summaries
    }

    /// Destroy every room.
    pub fn shutdown(&self) {
        let ids: Vec<String> = self.rooms.iter().map(|e| e.key().clone()).collect();
        let count = ids.len();
        for id in ids {
            // A concurrent destroy may win; that room is gone either way.
            let _ = self.destroy_room(&id);
        }
        tracing::info!(rooms = count, "room directory shut down");
    }

    // ── Keepalive ─────────────────────────────────────────────────────────────

    pub fn start(&self, room_id: &str) -> Result<()> {
        self.room(room_id)?.keepalive.start()
    }

    pub fn stop(&self, room_id: &str) -> Result<()> {
        self.room(room_id)?.keepalive.stop()
    }

    pub fn is_running(&self, room_id: &str) -> Result<bool> {
        Ok(self.room(room_id)?.keepalive.is_running())
    }

    /// Run one evaluation cycle for the room now.
    pub fn tick(&self, room_id: &str) -> Result<()> {
        self.room(room_id)?.keepalive.tick();
        Ok(())
    }

    pub fn add_peer(&self, room_id: &str, peer_id: &str) -> Result<()> {
        self.room(room_id)?.keepalive.add_peer(peer_id)
    }

    pub fn remove_peer(&self, room_id: &str, peer_id: &str) -> Result<()> {
        self.room(room_id)?.keepalive.remove_peer(peer_id)
    }

    pub fn set_peer_tags(
        &self,
        room_id: &str,
        peer_id: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<()> {
        self.room(room_id)?.keepalive.set_peer_tags(peer_id, tags)
    }

    pub fn note_ping_sent(&self, room_id: &str, peer_id: &str) -> Result<()> {
        self.room(room_id)?.keepalive.note_ping_sent(peer_id)
    }

    pub fn handle_pong(&self, room_id: &str, peer_id: &str) -> Result<()> {
        self.room(room_id)?.keepalive.handle_pong(peer_id)
    }

    pub fn status(&self, room_id: &str, peer_id: &str) -> Result<PeerStatus> {
        self.room(room_id)?.keepalive.status(peer_id)
    }

    pub fn rtt_ms(&self, room_id: &str, peer_id: &str) -> Result<u64> {
        self.room(room_id)?.keepalive.rtt_ms(peer_id)
    }

    pub fn peer_info(&self, room_id: &str, peer_id: &str) -> Result<PeerInfo> {
        self.room(room_id)?.keepalive.peer_info(peer_id)
    }

    pub fn all_peer_info(&self, room_id: &str) -> Result<HashMap<String, PeerInfo>> {
        Ok(self.room(room_id)?.keepalive.all_peer_info())
    }

    // ── Traffic ledger ────────────────────────────────────────────────────────

    /// Give the room a fresh ledger after `stats_destroy`.
    pub fn stats_create(&self, room_id: &str) -> Result<()> {
        let room = self.room(room_id)?;
        let mut ledger = room.ledger.write();
        if ledger.is_some() {
            return Err(MonitorError::LedgerExists(room_id.to_string()));
        }
        *ledger = Some(Arc::new(RoomStats::new(room_id)));
        tracing::info!(room = %room_id, "traffic ledger created");
        Ok(())
    }

    /// Drop the room's ledger and its counters. The keepalive side is untouched.
    pub fn stats_destroy(&self, room_id: &str) -> Result<()> {
        let room = self.room(room_id)?;
        room.ledger
            .write()
            .take()
            .ok_or_else(|| MonitorError::LedgerNotFound(room_id.to_string()))?;
        tracing::info!(room = %room_id, "traffic ledger destroyed");
        Ok(())
    }

    pub fn add_bytes_in(&self, room_id: &str, peer_id: &str, bytes: u64) -> Result<()> {
        self.ledger(room_id)?.add_bytes_in(peer_id, bytes)
    }

    pub fn add_bytes_out(&self, room_id: &str, peer_id: &str, bytes: u64) -> Result<()> {
        self.ledger(room_id)?.add_bytes_out(peer_id, bytes)
    }

    pub fn add_packet_lost(&self, room_id: &str) -> Result<()> {
        self.ledger(room_id)?.add_packet_lost();
        Ok(())
    }

    pub fn add_packets_lost(&self, room_id: &str, count: u64) -> Result<()> {
        self.ledger(room_id)?.add_packets_lost(count);
        Ok(())
    }

    pub fn remove_traffic_peer(&self, room_id: &str, peer_id: &str) -> Result<()> {
        self.ledger(room_id)?.remove_peer(peer_id)
    }

    pub fn snapshot(&self, room_id: &str) -> Result<HashMap<String, PeerTraffic>> {
        Ok(self.ledger(room_id)?.snapshot())
    }

    pub fn calculate_bitrates(&self, room_id: &str) -> Result<()> {
        self.ledger(room_id)?.calculate_bitrates();
        Ok(())
    }

    pub fn traffic_report(&self, room_id: &str) -> Result<RoomTrafficReport> {
        Ok(self.ledger(room_id)?.report())
    }

    fn ledger(&self, room_id: &str) -> Result<Arc<RoomStats>> {
        self.room(room_id)?.ledger()
    }
}
