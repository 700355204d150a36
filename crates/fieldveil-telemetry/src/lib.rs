//! fieldveil Telemetry
//!
//! Audit trail and observability for fieldveil.
//!
//! Provides:
//! - Immutable audit events with idempotent, at-least-once persistence
//! - In-memory and JSON-lines file stores
//! - A bounded background writer for fire-and-forget recording
//! - Best-effort notification fan-out and metrics collection

pub mod audit;
pub mod metrics;
pub mod notify;
pub mod service;
pub mod store;

pub use audit::{AuditEvent, AuditRecorder, MemoryAuditStore, Outcome, RecordReceipt};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use notify::{CompositeNotifier, LogNotifier, Notifier};
pub use service::AuditService;
pub use store::{JsonlAuditStore, StoreConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audit::{AuditEvent, AuditRecorder, MemoryAuditStore, Outcome, RecordReceipt};
    pub use crate::metrics::MetricsCollector;
    pub use crate::notify::{LogNotifier, Notifier};
    pub use crate::service::AuditService;
    pub use crate::store::{JsonlAuditStore, StoreConfig};
}
