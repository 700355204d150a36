//! Tokenization action and token vault seam

use crate::action::{leaf_text, ActionOutput, Capability, Params, ProtectAction};
use fieldveil_core::{Error, FieldValue, Result};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_PREFIX: &str = "tok";
const HASH_TOKEN_LEN: usize = 32;

/// External store mapping tokens back to original values.
///
/// Implementations own their durability and timeouts; a call exceeding its
/// deadline should return [`Error::Timeout`], which the engine treats as an
/// action execution failure.
pub trait TokenVault: Send + Sync {
    fn store(&self, token: &str, value: &FieldValue) -> Result<()>;
    fn lookup(&self, token: &str) -> Result<Option<FieldValue>>;
}

/// Process-local vault, suitable for tests and single-process embedding
#[derive(Default)]
pub struct InMemoryVault {
    entries: RwLock<HashMap<String, FieldValue>>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl TokenVault for InMemoryVault {
    fn store(&self, token: &str, value: &FieldValue) -> Result<()> {
        self.entries
            .write()
            .insert(token.to_string(), value.clone());
        Ok(())
    }

    fn lookup(&self, token: &str) -> Result<Option<FieldValue>> {
        Ok(self.entries.read().get(token).cloned())
    }
}

/// Reversible substitution of a value with an opaque vault-backed token.
///
/// Token format is `<prefix>_<body>` where `prefix` defaults to `tok` and
/// `body` depends on the `scheme` param:
/// - `uuid` (default): random UUID v4, unique per invocation;
/// - `hash`: first 32 hex chars of SHA-256 over the value, deterministic
///   so re-running a policy yields identical tokens.
pub struct TokenizeAction {
    vault: Arc<dyn TokenVault>,
}

impl TokenizeAction {
    pub fn new(vault: Arc<dyn TokenVault>) -> Self {
        Self { vault }
    }
}

impl ProtectAction for TokenizeAction {
    fn capability(&self) -> Capability {
        Capability::Reversible
    }

    fn check_params(&self, params: &Params) -> Result<()> {
        params.str_opt("prefix")?;
        match params.str_opt("scheme")? {
            None | Some("uuid") | Some("hash") => Ok(()),
            Some(other) => Err(Error::policy_parse(format!(
                "param 'scheme' must be 'uuid' or 'hash', got '{other}'"
            ))),
        }
    }

    fn transform(&self, value: &FieldValue, params: &Params) -> Result<ActionOutput> {
        let Some(text) = leaf_text(value)? else {
            return Ok(ActionOutput::null_passthrough());
        };

        let prefix = params.str_opt("prefix")?.unwrap_or(DEFAULT_PREFIX);
        let token = match params.str_opt("scheme")? {
            Some("hash") => {
                let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
                format!("{prefix}_{}", &digest[..HASH_TOKEN_LEN])
            }
            _ => format!("{prefix}_{}", Uuid::new_v4()),
        };

        self.vault.store(&token, value)?;

        Ok(ActionOutput::new(token.clone()).with_summary(format!("tokenized as {token}")))
    }

    fn reveal(&self, token: &str) -> Result<FieldValue> {
        self.vault
            .lookup(token)?
            .ok_or_else(|| Error::dependency(format!("token '{token}' not found in vault")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> TokenizeAction {
        TokenizeAction::new(Arc::new(InMemoryVault::new()))
    }

    #[test]
    fn round_trip_through_vault() {
        let action = action();
        let original = FieldValue::from("4111111111111111");

        let output = action.transform(&original, &Params::new()).unwrap();
        let token = output.value.as_str().unwrap();
        assert!(token.starts_with("tok_"));
        assert_ne!(output.value, original);

        assert_eq!(action.reveal(token).unwrap(), original);
    }

    #[test]
    fn unknown_token_is_a_dependency_error() {
        let action = action();
        assert!(matches!(
            action.reveal("tok_missing"),
            Err(Error::Dependency(_))
        ));
    }

    #[test]
    fn hash_scheme_is_deterministic() {
        let action = action();
        let params = Params::new().with("scheme", "hash");
        let value = FieldValue::from("alice@corp.example");

        let first = action.transform(&value, &params).unwrap();
        let second = action.transform(&value, &params).unwrap();
        assert_eq!(first.value, second.value);
    }

    #[test]
    fn uuid_scheme_is_unique_per_invocation() {
        let action = action();
        let value = FieldValue::from("alice@corp.example");

        let first = action.transform(&value, &Params::new()).unwrap();
        let second = action.transform(&value, &Params::new()).unwrap();
        assert_ne!(first.value, second.value);
    }

    #[test]
    fn custom_prefix_and_scheme_validation() {
        let action = action();
        let params = Params::new().with("prefix", "card").with("scheme", "hash");
        let output = action
            .transform(&FieldValue::from("x"), &params)
            .unwrap();
        assert!(output.value.as_str().unwrap().starts_with("card_"));

        assert!(action
            .check_params(&Params::new().with("scheme", "rot13"))
            .is_err());
    }
}
