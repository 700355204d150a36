//! Audit events and the recorder contract

use fieldveil_core::{FieldPath, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// Outcome of one applied (or failed) protective action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Outcome {
    /// The action produced a replacement value
    Success,

    /// The action failed; the reason never contains field values
    Failure { reason: String },
}

impl Outcome {
    /// Metrics label for this outcome
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure { .. } => "failure",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }
}

/// Immutable record of one field transformation attempt.
///
/// Created exactly once per attempt, never mutated, only read back for
/// compliance queries. Carries no sensitive values; the `summary` is
/// whatever the action declared safe to log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique id for this attempt, the idempotency key together with the
    /// field path
    pub correlation_id: String,

    /// When the attempt happened
    pub timestamp: SystemTime,

    /// Record the field belongs to
    pub record_id: String,

    /// Field that was transformed
    pub field_path: FieldPath,

    /// Action name that was applied
    pub action: String,

    /// Success or failure
    pub outcome: Outcome,

    /// Position in the record's canonical traversal order, fixing replay
    /// order regardless of physical write order
    pub sequence: u64,

    /// Action-produced, non-sensitive description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl AuditEvent {
    fn new(
        record_id: impl Into<String>,
        field_path: FieldPath,
        action: impl Into<String>,
        sequence: u64,
        outcome: Outcome,
        summary: Option<String>,
    ) -> Self {
        Self {
            correlation_id: format!("evt_{}", uuid::Uuid::new_v4()),
            timestamp: SystemTime::now(),
            record_id: record_id.into(),
            field_path,
            action: action.into(),
            outcome,
            sequence,
            summary,
        }
    }

    /// Event for a successful transformation
    pub fn success(
        record_id: impl Into<String>,
        field_path: FieldPath,
        action: impl Into<String>,
        sequence: u64,
        summary: Option<String>,
    ) -> Self {
        Self::new(record_id, field_path, action, sequence, Outcome::Success, summary)
    }

    /// Event for a failed transformation attempt
    pub fn failure(
        record_id: impl Into<String>,
        field_path: FieldPath,
        action: impl Into<String>,
        sequence: u64,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            record_id,
            field_path,
            action,
            sequence,
            Outcome::Failure {
                reason: reason.into(),
            },
            None,
        )
    }

    /// Deduplication key: correlation id plus field path
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.correlation_id, self.field_path)
    }
}

/// Receipt for a recorded event
#[derive(Debug, Clone, PartialEq)]
pub struct RecordReceipt {
    /// The idempotency key the store deduplicated on
    pub key: String,

    /// True when the event was already present and nothing was written
    pub deduplicated: bool,
}

/// Durable, idempotent, at-least-once audit persistence.
///
/// Callers may retry after a crash using the event's idempotency key; the
/// store deduplicates. `query` returns a record's events in traversal
/// (sequence) order.
pub trait AuditRecorder: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<RecordReceipt>;

    fn record_batch(&self, events: &[AuditEvent]) -> Result<Vec<RecordReceipt>> {
        events.iter().map(|event| self.record(event)).collect()
    }

    fn query(&self, record_id: &str) -> Result<Vec<AuditEvent>>;

    /// Number of stored events for a record, for compliance reporting
    fn count(&self, record_id: &str) -> Result<usize> {
        Ok(self.query(record_id)?.len())
    }

    /// Force buffered events to durable storage
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// In-process recorder backed by a hash map, for tests and embedding
#[derive(Default)]
pub struct MemoryAuditStore {
    events: Mutex<HashMap<String, AuditEvent>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl AuditRecorder for MemoryAuditStore {
    fn record(&self, event: &AuditEvent) -> Result<RecordReceipt> {
        let key = event.idempotency_key();
        let mut events = self.events.lock();
        let deduplicated = events.contains_key(&key);
        if !deduplicated {
            events.insert(key.clone(), event.clone());
        }
        Ok(RecordReceipt { key, deduplicated })
    }

    fn query(&self, record_id: &str) -> Result<Vec<AuditEvent>> {
        let mut matching: Vec<AuditEvent> = self
            .events
            .lock()
            .values()
            .filter(|event| event.record_id == record_id)
            .cloned()
            .collect();
        matching.sort_by_key(|event| event.sequence);
        Ok(matching)
    }
}
