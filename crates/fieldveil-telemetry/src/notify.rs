//! Notification fan-out
//!
//! Notifiers receive a subset of audit events (failures, flagged actions)
//! for out-of-band delivery. Delivery is strictly best-effort: a notifier
//! must never fail the transformation that produced the event, so the
//! contract is infallible and implementations swallow and log their own
//! transport errors.

use crate::audit::AuditEvent;
use std::sync::Arc;
use tracing::{info, warn};

/// Best-effort delivery of audit events to an out-of-band channel
pub trait Notifier: Send + Sync {
    fn deliver(&self, event: &AuditEvent);
}

/// Notifier that emits structured log lines
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn deliver(&self, event: &AuditEvent) {
        if event.outcome.is_failure() {
            warn!(
                record = %event.record_id,
                field = %event.field_path,
                action = %event.action,
                "protective action failed"
            );
        } else {
            info!(
                record = %event.record_id,
                field = %event.field_path,
                action = %event.action,
                "protective action applied"
            );
        }
    }
}

/// Fan-out to several notifiers in registration order
#[derive(Default)]
pub struct CompositeNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl CompositeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Notifier for CompositeNotifier {
    fn deliver(&self, event: &AuditEvent) {
        for sink in &self.sinks {
            sink.deliver(event);
        }
    }
}
