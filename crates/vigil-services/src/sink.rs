//! Event sinks: the seam between the engine and whatever distributes
//! liveness events to UI or control-plane clients.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use vigil_core::MonitorEvent;

/// Receiver of engine events.
///
/// Status events are delivered while the affected peer's record is
/// locked, so per-peer ordering matches the order of transitions.
/// Implementations must not block and must not call back into the
/// keepalive manager that emitted the event.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MonitorEvent);
}

impl EventSink for mpsc::UnboundedSender<MonitorEvent> {
    fn emit(&self, event: MonitorEvent) {
        if self.send(event).is_err() {
            tracing::trace!("event receiver dropped, discarding event");
        }
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEvents;

impl EventSink for DiscardEvents {
    fn emit(&self, _event: MonitorEvent) {}
}

/// Keeps events in memory until drained.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<MonitorEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every event recorded so far.
    pub fn drain(&self) -> Vec<MonitorEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: MonitorEvent) {
        self.events.lock().push(event);
    }
}
