//! Sealed action registry
//!
//! Registration happens once, before any transformation runs: actions are
//! added through [`RegistryBuilder`] and the builder is consumed by
//! [`RegistryBuilder::seal`], producing an immutable [`ActionRegistry`].
//! Because no unsealed registry can be handed to an engine, no
//! transformation can ever observe a partially registered table, and the
//! read path needs no locking.

use crate::action::ProtectAction;
use crate::encrypt::{EncryptAction, KeyStore};
use crate::hash::HashAction;
use crate::mask::MaskAction;
use crate::redact::RedactAction;
use crate::tokenize::{TokenVault, TokenizeAction};
use fieldveil_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Mutable registration phase
#[derive(Default)]
pub struct RegistryBuilder {
    actions: HashMap<String, Arc<dyn ProtectAction>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an action name. Names are case-insensitive; binding a name
    /// twice is a programmer error and fails with
    /// [`Error::DuplicateAction`].
    pub fn register(
        mut self,
        name: impl Into<String>,
        action: Arc<dyn ProtectAction>,
    ) -> Result<Self> {
        let name = name.into().to_ascii_lowercase();
        if self.actions.contains_key(&name) {
            return Err(Error::DuplicateAction(name));
        }
        debug!(action = %name, "registered action");
        self.actions.insert(name, action);
        Ok(self)
    }

    /// Publish the registry. After this point the table is immutable and
    /// safe for concurrent lookups.
    pub fn seal(self) -> ActionRegistry {
        ActionRegistry {
            actions: Arc::new(self.actions),
        }
    }
}

/// Immutable name-to-action table, cheap to clone and share
#[derive(Clone)]
pub struct ActionRegistry {
    actions: Arc<HashMap<String, Arc<dyn ProtectAction>>>,
}

impl ActionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with the built-in actions: `mask`, `redact`, `hash`,
    /// `tokenize`, and `encrypt`. The vault and key store are the injected
    /// external dependencies of the reversible actions.
    pub fn builtin(vault: Arc<dyn TokenVault>, keys: Arc<dyn KeyStore>) -> Result<Self> {
        Ok(RegistryBuilder::new()
            .register("mask", Arc::new(MaskAction::new()))?
            .register("redact", Arc::new(RedactAction::new()))?
            .register("hash", Arc::new(HashAction::new()))?
            .register("tokenize", Arc::new(TokenizeAction::new(vault)))?
            .register("encrypt", Arc::new(EncryptAction::new(keys)))?
            .seal())
    }

    /// Look up an action by name
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn ProtectAction>> {
        self.actions
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::UnknownAction(name.to_string()))
    }

    /// Whether a name is bound, used by policy validation
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered action names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypt::StaticKeyStore;
    use crate::tokenize::InMemoryVault;

    fn builtin() -> ActionRegistry {
        ActionRegistry::builtin(
            Arc::new(InMemoryVault::new()),
            Arc::new(StaticKeyStore::new().with_key("k1", b"key".to_vec())),
        )
        .unwrap()
    }

    #[test]
    fn builtin_actions_resolve_case_insensitively() {
        let registry = builtin();
        assert!(registry.resolve("MASK").is_ok());
        assert!(registry.resolve("tokenize").is_ok());
        assert_eq!(
            registry.names(),
            vec!["encrypt", "hash", "mask", "redact", "tokenize"]
        );
    }

    #[test]
    fn unknown_action_errors() {
        let registry = builtin();
        assert!(matches!(
            registry.resolve("rot13"),
            Err(Error::UnknownAction(_))
        ));
        assert!(!registry.contains("rot13"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let result = RegistryBuilder::new()
            .register("mask", Arc::new(MaskAction::new()))
            .unwrap()
            .register("MASK", Arc::new(MaskAction::new()));
        assert!(matches!(result, Err(Error::DuplicateAction(_))));
    }

    #[test]
    fn sealed_registry_is_shareable_across_threads() {
        let registry = builtin();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.resolve("hash").is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
