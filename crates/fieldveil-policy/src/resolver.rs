//! Rule resolution
//!
//! Resolution is two-phase and deterministic: selector matches are filtered
//! by condition, the highest specificity class wins, and within it the rule
//! declared earliest. Re-running the same policy against the same record
//! therefore always picks the same rules, a property the engine's replay
//! guarantees rely on.

use crate::rule::{Policy, Rule};
use fieldveil_core::{FieldPath, FieldValue};

/// Determine which rule, if any, applies to the field at `path` holding
/// `value`. Returns `None` when the field passes through unprotected.
///
/// A rule whose condition rejects the value does not apply at all, so a
/// lower-specificity rule without a condition can still match the field.
pub fn resolve<'a>(policy: &'a Policy, path: &FieldPath, value: &FieldValue) -> Option<&'a Rule> {
    let mut best: Option<&Rule> = None;

    for rule in policy.rules() {
        if !rule.selector.matches(path, value) {
            continue;
        }
        if let Some(condition) = &rule.condition {
            if !condition.evaluate(value) {
                continue;
            }
        }
        match best {
            // Strictly-greater keeps the earliest declaration on ties.
            Some(current) if rule.selector.specificity() <= current.selector.specificity() => {}
            _ => best = Some(rule),
        }
    }

    best
}
