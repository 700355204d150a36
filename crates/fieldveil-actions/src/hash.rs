//! Hashing action

use crate::action::{leaf_text, ActionOutput, Capability, Params, ProtectAction};
use fieldveil_core::{FieldValue, Result};
use sha2::{Digest, Sha256};

/// Irreversible replacement with a SHA-256 digest (lowercase hex).
///
/// An optional `salt` param is prepended to the value before hashing so
/// equal values hash equally within one policy but not across policies.
#[derive(Debug, Default)]
pub struct HashAction;

impl HashAction {
    pub fn new() -> Self {
        Self
    }
}

impl ProtectAction for HashAction {
    fn capability(&self) -> Capability {
        Capability::Irreversible
    }

    fn check_params(&self, params: &Params) -> Result<()> {
        params.str_opt("salt")?;
        Ok(())
    }

    fn transform(&self, value: &FieldValue, params: &Params) -> Result<ActionOutput> {
        let Some(text) = leaf_text(value)? else {
            return Ok(ActionOutput::null_passthrough());
        };

        let mut hasher = Sha256::new();
        if let Some(salt) = params.str_opt("salt")? {
            hasher.update(salt.as_bytes());
        }
        hasher.update(text.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        let summary = format!("sha256:{}", &digest[..8]);

        Ok(ActionOutput::new(digest).with_summary(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(value: &str, params: &Params) -> String {
        let output = HashAction::new()
            .transform(&FieldValue::from(value), params)
            .unwrap();
        match output.value {
            FieldValue::String(s) => s,
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn hashing_is_deterministic() {
        let params = Params::new();
        assert_eq!(hash("alice", &params), hash("alice", &params));
        assert_ne!(hash("alice", &params), hash("bob", &params));
    }

    #[test]
    fn salt_changes_digest() {
        let plain = Params::new();
        let salted = Params::new().with("salt", "s1");
        assert_ne!(hash("alice", &plain), hash("alice", &salted));
    }

    #[test]
    fn output_is_hex_and_leaks_nothing() {
        let digest = hash("supersecret", &Params::new());
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!digest.contains("supersecret"));
    }

    #[test]
    fn summary_is_a_digest_prefix() {
        let output = HashAction::new()
            .transform(&FieldValue::from("alice"), &Params::new())
            .unwrap();
        let summary = output.summary.unwrap();
        assert!(summary.starts_with("sha256:"));
        assert_eq!(summary.len(), "sha256:".len() + 8);
    }
}
