//! fieldveil Policy
//!
//! Declarative policy model for field-level data protection.
//!
//! Policies are defined in YAML or JSON and specify, per rule:
//! - a field selector (exact path, wildcard path, or type matcher)
//! - a registered action name with parameters
//! - an optional condition predicate over the field value
//! - a failure policy (`fail_closed` or `fail_open_redact`)

pub mod condition;
pub mod resolver;
pub mod rule;
pub mod selector;

pub use condition::{Condition, ConditionSpec};
pub use resolver::resolve;
pub use rule::{FailurePolicy, Policy, PolicySpec, Rule, RuleSpec};
pub use selector::{Selector, Specificity};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::resolver::resolve;
    pub use crate::rule::{FailurePolicy, Policy, PolicySpec, Rule, RuleSpec};
    pub use crate::selector::{Selector, Specificity};
}
