//! Protective action trait and parameter handling

use fieldveil_core::{Error, FieldValue, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether an action's output can be turned back into the original value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Output carries a reference recoverable via `reveal`
    Reversible,

    /// Output cannot be reversed (masking, hashing, redaction)
    Irreversible,
}

/// Per-rule action parameters from the policy document.
///
/// Stored sorted by option name; values are plain JSON scalars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(pub BTreeMap<String, serde_json::Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and embedded policies
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// String-typed option, erroring when present with the wrong type
    pub fn str_opt(&self, key: &str) -> Result<Option<&str>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(Error::policy_parse(format!(
                "param '{key}' must be a string, got {other}"
            ))),
        }
    }

    /// Unsigned integer option
    pub fn usize_opt(&self, key: &str) -> Result<Option<usize>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .map(|v| Some(v as usize))
                .ok_or_else(|| Error::policy_parse(format!("param '{key}' must be a non-negative integer"))),
            Some(other) => Err(Error::policy_parse(format!(
                "param '{key}' must be an integer, got {other}"
            ))),
        }
    }

    /// Single-character option
    pub fn char_opt(&self, key: &str) -> Result<Option<char>> {
        match self.str_opt(key)? {
            None => Ok(None),
            Some(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Some(c)),
                    _ => Err(Error::policy_parse(format!(
                        "param '{key}' must be a single character"
                    ))),
                }
            }
        }
    }
}

/// Result of one action invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput {
    /// Replacement value for the field
    pub value: FieldValue,

    /// Non-sensitive description safe to log and persist. The action alone
    /// decides what, if anything, goes here; original values never do.
    pub summary: Option<String>,
}

impl ActionOutput {
    pub fn new(value: impl Into<FieldValue>) -> Self {
        Self {
            value: value.into(),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Null input passed through untouched
    pub fn null_passthrough() -> Self {
        Self::new(FieldValue::Null).with_summary("null passthrough")
    }
}

/// A named, parameterized protective transformation.
///
/// Actions are stateless with respect to the record; external state (a
/// token vault, a key store) is reached through dependencies injected at
/// construction. Implementations must be safe to call concurrently.
pub trait ProtectAction: Send + Sync {
    /// Reversibility of this action's output
    fn capability(&self) -> Capability;

    /// Validate rule parameters at policy load time. Returning an error
    /// here rejects the whole policy.
    fn check_params(&self, params: &Params) -> Result<()>;

    /// Transform a leaf value. Errors are wrapped with field context by the
    /// engine and governed by the rule's failure policy.
    fn transform(&self, value: &FieldValue, params: &Params) -> Result<ActionOutput>;

    /// Recover the original value from a reversible action's output.
    ///
    /// Privileged path; the engine gates it on [`Capability::Reversible`].
    fn reveal(&self, _token: &str) -> Result<FieldValue> {
        Err(Error::NotReversible(
            "action does not support reveal".to_string(),
        ))
    }
}

/// Leaf text for an action to operate on, or `None` for null passthrough.
///
/// Containers never reach actions (the engine only visits leaves), so they
/// are reported as dependency misuse.
pub(crate) fn leaf_text(value: &FieldValue) -> Result<Option<String>> {
    if matches!(value, FieldValue::Null) {
        return Ok(None);
    }
    value
        .to_text()
        .map(Some)
        .ok_or_else(|| Error::dependency(format!("cannot protect {} value", value.kind())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_param_accessors() {
        let params = Params::new()
            .with("keep", 2)
            .with("mask_char", "#")
            .with("salt", "pepper");

        assert_eq!(params.usize_opt("keep").unwrap(), Some(2));
        assert_eq!(params.char_opt("mask_char").unwrap(), Some('#'));
        assert_eq!(params.str_opt("salt").unwrap(), Some("pepper"));
        assert_eq!(params.usize_opt("missing").unwrap(), None);
    }

    #[test]
    fn wrong_param_types_are_rejected() {
        let params = Params::new().with("keep", "two").with("mask_char", "ab");
        assert!(params.usize_opt("keep").is_err());
        assert!(params.char_opt("mask_char").is_err());
    }
}
