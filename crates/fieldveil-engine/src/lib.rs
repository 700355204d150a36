//! fieldveil Engine
//!
//! The transformation engine that ties the other fieldveil crates
//! together: it walks a record, resolves the winning rule per field
//! through the policy layer, executes actions from the registry, and
//! records one audit event per touched field.
//!
//! ```no_run
//! use fieldveil_actions::{ActionRegistry, InMemoryVault, StaticKeyStore};
//! use fieldveil_core::Record;
//! use fieldveil_engine::TransformEngine;
//! use fieldveil_policy::Policy;
//! use fieldveil_telemetry::MemoryAuditStore;
//! use std::sync::Arc;
//!
//! # fn main() -> fieldveil_core::Result<()> {
//! let registry = ActionRegistry::builtin(
//!     Arc::new(InMemoryVault::new()),
//!     Arc::new(StaticKeyStore::new().with_key("k1", b"key-material".to_vec())),
//! )?;
//! let policy = Policy::from_yaml(
//!     "id: pii\nrules:\n  - selector: email\n    action: mask\n",
//!     &registry,
//! )?;
//!
//! let engine = TransformEngine::builder(registry, Arc::new(MemoryAuditStore::new())).build();
//!
//! let mut record = Record::new("rec-1");
//! record.set("email", "john@doe.com");
//! let transformed = engine.apply(&policy, &record)?;
//! # Ok(())
//! # }
//! ```

pub mod engine;

pub use engine::{TransformEngine, TransformEngineBuilder, Transformed, REDACTION_MARKER};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::{TransformEngine, Transformed};
    pub use fieldveil_actions::prelude::*;
    pub use fieldveil_core::prelude::*;
    pub use fieldveil_policy::prelude::*;
    pub use fieldveil_telemetry::prelude::*;
}
