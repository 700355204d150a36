//! fieldveil Actions
//!
//! Protective transformations and the registry that names them.
//!
//! Built-in actions:
//! - `mask`: irreversible partial obfuscation
//! - `redact`: irreversible replacement with a fixed marker
//! - `hash`: irreversible SHA-256 digest
//! - `tokenize`: reversible vault-backed token substitution
//! - `encrypt`: reversible key-store-backed encryption
//!
//! External state (token vault, key store) is injected, never ambient.

pub mod action;
pub mod encrypt;
pub mod hash;
pub mod mask;
pub mod redact;
pub mod registry;
pub mod tokenize;

pub use action::{ActionOutput, Capability, Params, ProtectAction};
pub use encrypt::{EncryptAction, KeyStore, StaticKeyStore};
pub use hash::HashAction;
pub use mask::MaskAction;
pub use redact::RedactAction;
pub use registry::{ActionRegistry, RegistryBuilder};
pub use tokenize::{InMemoryVault, TokenVault, TokenizeAction};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::action::{ActionOutput, Capability, Params, ProtectAction};
    pub use crate::registry::{ActionRegistry, RegistryBuilder};
    pub use crate::tokenize::{InMemoryVault, TokenVault};
}
