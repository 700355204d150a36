//! fieldveil Core
//!
//! Core types shared across fieldveil components.
//!
//! This crate provides:
//! - The generic tagged value tree records are made of
//! - Field-path addressing and canonical record traversal
//! - Error types and result handling

pub mod error;
pub mod record;
pub mod value;

pub use error::{Error, Result};
pub use record::{FieldPath, Record};
pub use value::{FieldValue, ValueKind};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::record::{FieldPath, Record};
    pub use crate::value::{FieldValue, ValueKind};
}
