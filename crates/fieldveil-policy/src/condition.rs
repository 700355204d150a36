//! Per-rule condition predicates

use fieldveil_core::{Error, FieldValue, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Condition as written in the policy document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Regex the field's text form must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Exact text the field must equal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
}

/// Compiled condition, evaluated against field values during resolution
#[derive(Debug, Clone)]
pub struct Condition {
    pattern: Option<Regex>,
    equals: Option<String>,
}

impl Condition {
    /// Compile a condition spec. Invalid regexes reject the policy at load.
    pub fn compile(spec: &ConditionSpec) -> Result<Self> {
        let pattern = match &spec.pattern {
            Some(raw) => Some(
                Regex::new(raw)
                    .map_err(|e| Error::policy_parse(format!("invalid condition pattern: {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            pattern,
            equals: spec.equals.clone(),
        })
    }

    /// Whether the value satisfies every predicate present. Values without
    /// a text form (null, containers) never satisfy a condition.
    pub fn evaluate(&self, value: &FieldValue) -> bool {
        let Some(text) = value.to_text() else {
            return false;
        };
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&text) {
                return false;
            }
        }
        if let Some(equals) = &self.equals {
            if *equals != text {
                return false;
            }
        }
        true
    }
}
