//! Keepalive manager: one per room.
//!
//! Owns the room's peer registry and drives the heartbeat cycle. Every
//! tick evaluates each tracked peer's timeout, emits a status event on a
//! change, then records a ping and emits a `Ping` event so the transport
//! layer can put an actual ping on the wire. Pongs arrive independently
//! through `handle_pong`.
//!
//! Locking:
//!   peer map     DashMap: structural changes lock one shard
//!   peer record  per-peer Mutex: one writer at a time per peer
//!   tick_lock    serializes ticks; `stop` takes it to wait out a tick in flight
//!   scheduler    guards the timer task handle

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use vigil_core::error::validate_id;
use vigil_core::{KeepaliveConfig, MonitorError, MonitorEvent, PeerStatus, Result};

use crate::heartbeat::{PeerHeartbeat, PeerInfo};
use crate::sink::EventSink;

type PeerRecord = Arc<Mutex<PeerHeartbeat>>;

pub struct KeepaliveManager {
    room_id: String,
    config: KeepaliveConfig,
    peers: DashMap<String, PeerRecord>,
    sink: Arc<dyn EventSink>,
    runtime: Handle,
    tick_lock: Mutex<()>,
    scheduler: Mutex<SchedulerState>,
}

#[derive(Default)]
struct SchedulerState {
    run: Option<ScheduledRun>,
    /// Set once the owning room is destroyed. Start is refused afterwards.
    closed: bool,
}

struct ScheduledRun {
    /// Cleared by `stop`. Checked under the tick lock before every tick.
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl KeepaliveManager {
    pub fn new(
        room_id: impl Into<String>,
        config: KeepaliveConfig,
        sink: Arc<dyn EventSink>,
        runtime: Handle,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            config,
            peers: DashMap::new(),
            sink,
            runtime,
            tick_lock: Mutex::new(()),
            scheduler: Mutex::new(SchedulerState::default()),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn config(&self) -> KeepaliveConfig {
        self.config
    }

    // ── Scheduler ─────────────────────────────────────────────────────────────

    /// Begin ticking at the configured interval. The first tick runs immediately.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut sched = self.scheduler.lock();
        if sched.closed {
            return Err(MonitorError::RoomNotFound(self.room_id.clone()));
        }
        if sched.run.is_some() {
            return Err(MonitorError::AlreadyRunning(self.room_id.clone()));
        }

        let active = Arc::new(AtomicBool::new(true));
        let task = self.runtime.spawn(run_loop(
            Arc::downgrade(self),
            active.clone(),
            Instant::now(),
            self.config.interval,
        ));
        sched.run = Some(ScheduledRun { active, task });

        tracing::info!(
            room = %self.room_id,
            interval_ms = self.config.interval_ms(),
            timeout_ms = self.config.timeout_ms(),
            "keepalive started"
        );
        Ok(())
    }

    /// Halt ticking. Returns after any tick already evaluating has finished;
    /// no tick runs once this returns.
    pub fn stop(&self) -> Result<()> {
        let run = self
            .scheduler
            .lock()
            .run
            .take()
            .ok_or_else(|| MonitorError::NotRunning(self.room_id.clone()))?;
        self.halt(run);
        tracing::info!(room = %self.room_id, "keepalive stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.lock().run.is_some()
    }

    /// Stop for good and release every peer record. Used when the room is destroyed.
    pub(crate) fn close(&self) {
        let run = {
            let mut sched = self.scheduler.lock();
            sched.closed = true;
            sched.run.take()
        };
        if let Some(run) = run {
            self.halt(run);
        }
        let ids: Vec<String> = self.peers.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, peer)) = self.peers.remove(&id) {
                peer.lock().mark_removed();
            }
        }
    }

    fn halt(&self, run: ScheduledRun) {
        run.active.store(false, Ordering::Release);
        run.task.abort();
        drop(self.tick_lock.lock());
    }

    /// Run one evaluation cycle now, outside the timer.
    pub fn tick(&self) {
        let _tick = self.tick_lock.lock();
        self.evaluate_all(Instant::now());
    }

    fn tick_if_active(&self, active: &AtomicBool) -> bool {
        let _tick = self.tick_lock.lock();
        if !active.load(Ordering::Acquire) {
            return false;
        }
        self.evaluate_all(Instant::now());
        true
    }

    fn evaluate_all(&self, now: Instant) {
        // Copy the handles out so the map is not held while records are locked.
        let peers: Vec<PeerRecord> = self.peers.iter().map(|e| e.value().clone()).collect();
        tracing::trace!(room = %self.room_id, peers = peers.len(), "keepalive tick");

        for peer in peers {
            let ping_target = {
                let mut hb = peer.lock();
                if hb.is_removed() {
                    continue;
                }
                if let Some(status) = hb.evaluate(now, self.config.timeout) {
                    self.emit_transition(&hb, status);
                }
                hb.mark_ping_sent(now);
                hb.peer_id().to_string()
            };
            self.sink.emit(MonitorEvent::ping(&self.room_id, &ping_target));
        }
    }

    fn emit_transition(&self, hb: &PeerHeartbeat, status: PeerStatus) {
        tracing::debug!(
            room = %self.room_id,
            peer = %hb.peer_id(),
            %status,
            missed_pongs = hb.missed_pongs(),
            "peer status changed"
        );
        if let Some(event) =
            MonitorEvent::transition(&self.room_id, hb.peer_id(), status, hb.rtt_ms())
        {
            self.sink.emit(event);
        }
    }

    // ── Peer registry ─────────────────────────────────────────────────────────

    /// Start tracking a peer. It begins as `unknown` with no RTT sample.
    pub fn add_peer(&self, peer_id: &str) -> Result<()> {
        validate_id("peer_id", peer_id)?;
        match self.peers.entry(peer_id.to_string()) {
            Entry::Occupied(_) => Err(MonitorError::AlreadyTracked(peer_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(PeerHeartbeat::new(
                    peer_id,
                    Instant::now(),
                ))));
                tracing::debug!(room = %self.room_id, peer = %peer_id, "peer tracked");
                Ok(())
            }
        }
    }

    /// Stop tracking a peer. A tick holding its record skips it.
    pub fn remove_peer(&self, peer_id: &str) -> Result<()> {
        let (_, peer) = self
            .peers
            .remove(peer_id)
            .ok_or_else(|| MonitorError::PeerNotFound(peer_id.to_string()))?;
        peer.lock().mark_removed();
        tracing::debug!(room = %self.room_id, peer = %peer_id, "peer untracked");
        Ok(())
    }

    pub fn set_peer_tags(&self, peer_id: &str, tags: BTreeMap<String, String>) -> Result<()> {
        self.with_peer(peer_id, |hb| hb.set_tags(tags))
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    // ── Ping / pong ───────────────────────────────────────────────────────────

    /// Record a ping to `peer_id` now and hand it to the send hook.
    pub fn note_ping_sent(&self, peer_id: &str) -> Result<()> {
        self.note_ping_sent_at(peer_id, Instant::now())
    }

    pub fn note_ping_sent_at(&self, peer_id: &str, at: Instant) -> Result<()> {
        self.with_peer(peer_id, |hb| hb.mark_ping_sent(at))?;
        self.sink.emit(MonitorEvent::ping(&self.room_id, peer_id));
        Ok(())
    }

    /// Record a pong from `peer_id` received now.
    pub fn handle_pong(&self, peer_id: &str) -> Result<()> {
        self.handle_pong_at(peer_id, Instant::now())
    }

    pub fn handle_pong_at(&self, peer_id: &str, at: Instant) -> Result<()> {
        self.with_peer(peer_id, |hb| {
            let previous = hb.mark_pong_received(at);
            if previous != PeerStatus::Online {
                self.emit_transition(hb, PeerStatus::Online);
            }
            tracing::trace!(
                room = %self.room_id,
                peer = %peer_id,
                rtt_ms = hb.rtt_ms(),
                "pong"
            );
        })
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn status(&self, peer_id: &str) -> Result<PeerStatus> {
        let now = Instant::now();
        self.with_peer(peer_id, |hb| hb.status_at(now, self.config.timeout))
    }

    /// Latest RTT sample in milliseconds; 0 before the first sample.
    pub fn rtt_ms(&self, peer_id: &str) -> Result<u64> {
        self.with_peer(peer_id, |hb| hb.rtt_ms())
    }

    pub fn peer_info(&self, peer_id: &str) -> Result<PeerInfo> {
        let now = Instant::now();
        self.with_peer(peer_id, |hb| hb.info(now, self.config.timeout))
    }

    /// Snapshot of every tracked peer. Each record is read under its own lock.
    pub fn all_peer_info(&self) -> HashMap<String, PeerInfo> {
        let now = Instant::now();
        let peers: Vec<PeerRecord> = self.peers.iter().map(|e| e.value().clone()).collect();
        peers
            .into_iter()
            .filter_map(|peer| {
                let hb = peer.lock();
                if hb.is_removed() {
                    return None;
                }
                Some((hb.peer_id().to_string(), hb.info(now, self.config.timeout)))
            })
            .collect()
    }

    fn with_peer<R>(&self, peer_id: &str, f: impl FnOnce(&mut PeerHeartbeat) -> R) -> Result<R> {
        let peer = self
            .peers
            .get(peer_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| MonitorError::PeerNotFound(peer_id.to_string()))?;
        let mut hb = peer.lock();
        if hb.is_removed() {
            return Err(MonitorError::PeerNotFound(peer_id.to_string()));
        }
        Ok(f(&mut hb))
    }
}

impl Drop for KeepaliveManager {
    fn drop(&mut self) {
        if let Some(run) = self.scheduler.get_mut().run.take() {
            run.active.store(false, Ordering::Release);
            run.task.abort();
        }
    }
}

/// Timer loop. Holds only a weak handle so a dropped manager ends the task.
/// Ticks stay on the grid laid from `origin`; a late tick skips ahead.
async fn run_loop(
    manager: Weak<KeepaliveManager>,
    active: Arc<AtomicBool>,
    origin: Instant,
    period: Duration,
) {
    let mut interval = tokio::time::interval_at(origin, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Some(manager) = manager.upgrade() else {
            return;
        };
        if !manager.tick_if_active(&active) {
            return;
        }
    }
}
