//! vigil-core — shared types for the Vigil monitoring engine.
//! Peer status and its transition rules, emitted events, the error
//! taxonomy, and configuration. All other Vigil crates depend on this one.

pub mod config;
pub mod error;
pub mod event;
pub mod status;

pub use config::{KeepaliveConfig, VigilConfig};
pub use error::{MonitorError, Result};
pub use event::MonitorEvent;
pub use status::PeerStatus;
