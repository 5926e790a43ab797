//! Error taxonomy for every engine operation.
//!
//! All variants are local and recoverable. An operation that fails leaves
//! engine state unchanged.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("room not found: {0}")]
    RoomNotFound(String),
    #[error("room already exists: {0}")]
    AlreadyExists(String),
    #[error("peer already tracked: {0}")]
    AlreadyTracked(String),
    #[error("peer not found: {0}")]
    PeerNotFound(String),
    #[error("keepalive already running in room {0}")]
    AlreadyRunning(String),
    #[error("keepalive not running in room {0}")]
    NotRunning(String),
    #[error("no traffic ledger for room {0}")]
    LedgerNotFound(String),
    #[error("traffic ledger already exists for room {0}")]
    LedgerExists(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// True for the variants that report a missing room, peer, or ledger.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MonitorError::RoomNotFound(_)
                | MonitorError::PeerNotFound(_)
                | MonitorError::LedgerNotFound(_)
        )
    }
}

/// Reject empty identifiers. `what` names the field in the error message.
pub fn validate_id(what: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(MonitorError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Convert a signed byte count from an untyped boundary into a counter increment.
pub fn byte_count(n: i64) -> Result<u64> {
    u64::try_from(n)
        .map_err(|_| MonitorError::InvalidArgument(format!("byte count must be >= 0, got {n}")))
}
