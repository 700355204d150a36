//! Policy and rule definitions
//!
//! Policies are written in YAML (or JSON) and loaded through
//! [`Policy::load`], the only constructor. Loading validates every rule
//! against the sealed action registry and is all-or-nothing: one invalid
//! rule rejects the whole policy.

use crate::condition::{Condition, ConditionSpec};
use crate::selector::Selector;
use fieldveil_actions::{ActionRegistry, Params};
use fieldveil_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// What the engine does when a rule's action fails on a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole transformation; never return a partially
    /// protected record. The safe default.
    #[default]
    FailClosed,

    /// Replace the field with a fixed redaction marker, record a failure
    /// audit event, and continue with the remaining fields.
    FailOpenRedact,
}

/// A single rule as written in the policy document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Field selector string (exact path, wildcard path, or `type:` matcher)
    pub selector: String,

    /// Registered action name
    pub action: String,

    /// Action parameters
    #[serde(default)]
    pub params: Params,

    /// Optional predicate the field value must satisfy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionSpec>,

    /// Failure policy for this rule; the engine's default applies when unset
    #[serde(default, alias = "onFailure", skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<FailurePolicy>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A complete policy as written in the policy document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySpec {
    /// Policy identifier
    pub id: String,

    /// Version of the policy
    #[serde(default)]
    pub version: String,

    /// Rules in declaration order
    pub rules: Vec<RuleSpec>,
}

/// Accepts documents wrapped in a top-level `policy:` key
#[derive(Debug, Deserialize)]
struct PolicyDocument {
    policy: PolicySpec,
}

/// A validated, compiled rule. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Declaration position within the policy, the resolver's tie-break
    pub index: usize,

    /// Compiled field selector
    pub selector: Selector,

    /// Normalized action name
    pub action: String,

    /// Action parameters, already schema-checked
    pub params: Params,

    /// Compiled condition predicate
    pub condition: Option<Condition>,

    /// Failure policy, when the rule overrides the engine default
    pub on_failure: Option<FailurePolicy>,

    /// Human-readable description
    pub description: Option<String>,
}

/// A validated protection policy. Constructed only via [`Policy::load`];
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct Policy {
    id: String,
    version: String,
    rules: Vec<Rule>,
}

impl Policy {
    /// Validate a policy spec against the action registry and compile it.
    ///
    /// Fails with [`Error::PolicyValidation`] naming the offending rule when
    /// a selector is malformed, an action is unregistered, parameters fail
    /// the action's schema check, or a condition regex does not compile.
    pub fn load(spec: PolicySpec, registry: &ActionRegistry) -> Result<Self> {
        let mut rules = Vec::with_capacity(spec.rules.len());

        for (index, rule_spec) in spec.rules.into_iter().enumerate() {
            let selector = Selector::parse(&rule_spec.selector)
                .map_err(|e| Error::rule_invalid(index, e.to_string()))?;

            let action_name = rule_spec.action.to_ascii_lowercase();
            let action = registry.resolve(&action_name).map_err(|_| {
                Error::rule_invalid(
                    index,
                    format!(
                        "unknown action '{}', registered actions: {}",
                        rule_spec.action,
                        registry.names().join(", ")
                    ),
                )
            })?;

            action
                .check_params(&rule_spec.params)
                .map_err(|e| Error::rule_invalid(index, e.to_string()))?;

            let condition = match &rule_spec.condition {
                Some(spec) => Some(
                    Condition::compile(spec)
                        .map_err(|e| Error::rule_invalid(index, e.to_string()))?,
                ),
                None => None,
            };

            rules.push(Rule {
                index,
                selector,
                action: action_name,
                params: rule_spec.params,
                condition,
                on_failure: rule_spec.on_failure,
                description: rule_spec.description,
            });
        }

        info!(policy = %spec.id, rules = rules.len(), "policy loaded");

        Ok(Self {
            id: spec.id,
            version: spec.version,
            rules,
        })
    }

    /// Load a policy from YAML text. A top-level `policy:` wrapper key is
    /// accepted but not required.
    pub fn from_yaml(yaml: &str, registry: &ActionRegistry) -> Result<Self> {
        let spec = match serde_yaml::from_str::<PolicyDocument>(yaml) {
            Ok(doc) => doc.policy,
            Err(_) => serde_yaml::from_str::<PolicySpec>(yaml)
                .map_err(|e| Error::policy_parse(e.to_string()))?,
        };
        Self::load(spec, registry)
    }

    /// Load a policy from JSON text
    pub fn from_json(json: &str, registry: &ActionRegistry) -> Result<Self> {
        let spec = match serde_json::from_str::<PolicyDocument>(json) {
            Ok(doc) => doc.policy,
            Err(_) => serde_json::from_str::<PolicySpec>(json)
                .map_err(|e| Error::policy_parse(e.to_string()))?,
        };
        Self::load(spec, registry)
    }

    /// Load a policy from a YAML or JSON file
    pub fn from_file(
        path: impl AsRef<std::path::Path>,
        registry: &ActionRegistry,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, registry)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Rules in declaration order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}
