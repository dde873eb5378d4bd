//! Audit sink trait and in-process sinks.

use crate::{AuditError, Event, Result};
use parking_lot::Mutex;

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Records an event. Returns once the event is durably committed.
    fn record(&self, event: &Event) -> Result<()>;
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAudit;

impl AuditSink for NoopAudit {
    fn record(&self, event: &Event) -> Result<()> {
        tracing::debug!(id = %event.id, kind = %event.kind, "Audit disabled, dropping event");
        Ok(())
    }
}

/// Sink that keeps events in memory, optionally failing every call.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<Event>>,
    fail: bool,
}

impl RecordingAudit {
    /// Creates a sink that accepts every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that rejects every event.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Returns the events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, event: &Event) -> Result<()> {
        if self.fail {
            return Err(AuditError::Rejected {
                stage: "check_tx",
                code: 1,
                log: "rejected by test sink".to_string(),
            });
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}
