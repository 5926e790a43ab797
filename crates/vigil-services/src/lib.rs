//! vigil-services — the monitoring engine.
//!
//! Per room: a keepalive manager that owns peer liveness state and drives
//! the ping cycle, and a traffic ledger of per-peer byte counters. The
//! room directory ties both to a room id and gates every operation.

pub mod directory;
pub mod heartbeat;
pub mod keepalive;
pub mod sink;
pub mod stats;

pub use directory::{Room, RoomDirectory, RoomSummary};
pub use heartbeat::{PeerHeartbeat, PeerInfo};
pub use keepalive::KeepaliveManager;
pub use sink::{DiscardEvents, EventLog, EventSink};
pub use stats::{PeerTraffic, RoomStats, RoomTrafficReport, TrafficTotals};
