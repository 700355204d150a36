//! Field selectors
//!
//! Three selector forms, in decreasing specificity:
//! - exact dotted path: `user.ssn`
//! - wildcard path with single-segment wildcards: `*.ssn`, `users.*.email`
//! - type matcher: `type:string`

use fieldveil_core::{Error, FieldPath, FieldValue, Result, ValueKind};
use std::fmt;

/// Specificity class of a selector. Exact beats wildcard beats type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    Type = 0,
    Wildcard = 1,
    Exact = 2,
}

/// One segment of a wildcard selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardSegment {
    Literal(String),
    Any,
}

/// A parsed field selector
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Exact(FieldPath),
    Wildcard(Vec<WildcardSegment>),
    Type(ValueKind),
}

impl Selector {
    /// Parse a selector string from a policy document
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::policy_parse("selector must not be empty"));
        }

        if let Some(kind_name) = raw.strip_prefix("type:") {
            let kind = ValueKind::parse(kind_name).ok_or_else(|| {
                Error::policy_parse(format!("unknown type matcher 'type:{kind_name}'"))
            })?;
            return Ok(Selector::Type(kind));
        }

        let segments: Vec<&str> = raw.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::policy_parse(format!(
                "selector '{raw}' has an empty path segment"
            )));
        }
        // A '*' is only valid as a whole segment, not embedded in one.
        if let Some(bad) = segments.iter().find(|s| s.contains('*') && **s != "*") {
            return Err(Error::policy_parse(format!(
                "selector '{raw}' has a partial wildcard segment '{bad}'"
            )));
        }

        if segments.contains(&"*") {
            Ok(Selector::Wildcard(
                segments
                    .into_iter()
                    .map(|s| {
                        if s == "*" {
                            WildcardSegment::Any
                        } else {
                            WildcardSegment::Literal(s.to_string())
                        }
                    })
                    .collect(),
            ))
        } else {
            Ok(Selector::Exact(FieldPath::from(raw)))
        }
    }

    /// Specificity class used by the rule resolver
    pub fn specificity(&self) -> Specificity {
        match self {
            Selector::Exact(_) => Specificity::Exact,
            Selector::Wildcard(_) => Specificity::Wildcard,
            Selector::Type(_) => Specificity::Type,
        }
    }

    /// Whether this selector matches a field at `path` holding `value`
    pub fn matches(&self, path: &FieldPath, value: &FieldValue) -> bool {
        match self {
            Selector::Exact(exact) => exact == path,
            Selector::Wildcard(segments) => {
                let path_segments = path.segments();
                segments.len() == path_segments.len()
                    && segments.iter().zip(path_segments).all(|(s, p)| match s {
                        WildcardSegment::Any => true,
                        WildcardSegment::Literal(lit) => lit == p,
                    })
            }
            Selector::Type(kind) => value.kind() == *kind,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Exact(path) => write!(f, "{path}"),
            Selector::Wildcard(segments) => {
                let rendered: Vec<&str> = segments
                    .iter()
                    .map(|s| match s {
                        WildcardSegment::Any => "*",
                        WildcardSegment::Literal(lit) => lit.as_str(),
                    })
                    .collect();
                f.write_str(&rendered.join("."))
            }
            Selector::Type(kind) => write!(f, "type:{kind}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_selector_matches_only_its_path() {
        let selector = Selector::parse("user.ssn").unwrap();
        let value = FieldValue::from("123");
        assert!(selector.matches(&"user.ssn".into(), &value));
        assert!(!selector.matches(&"admin.ssn".into(), &value));
        assert_eq!(selector.specificity(), Specificity::Exact);
    }

    #[test]
    fn wildcard_matches_one_segment() {
        let selector = Selector::parse("*.ssn").unwrap();
        let value = FieldValue::from("123");
        assert!(selector.matches(&"user.ssn".into(), &value));
        assert!(selector.matches(&"admin.ssn".into(), &value));
        assert!(!selector.matches(&"ssn".into(), &value));
        assert!(!selector.matches(&"a.b.ssn".into(), &value));
        assert_eq!(selector.specificity(), Specificity::Wildcard);
    }

    #[test]
    fn type_selector_matches_by_kind() {
        let selector = Selector::parse("type:string").unwrap();
        assert!(selector.matches(&"anything".into(), &FieldValue::from("x")));
        assert!(!selector.matches(&"anything".into(), &FieldValue::Int(1)));
        assert_eq!(selector.specificity(), Specificity::Type);
    }

    #[test]
    fn specificity_ordering() {
        assert!(Specificity::Exact > Specificity::Wildcard);
        assert!(Specificity::Wildcard > Specificity::Type);
    }

    #[test]
    fn invalid_selectors_rejected() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("user..ssn").is_err());
        assert!(Selector::parse("us*r.ssn").is_err());
        assert!(Selector::parse("type:widget").is_err());
    }

    #[test]
    fn display_round_trip() {
        for raw in ["user.ssn", "*.ssn", "users.*.email", "type:number"] {
            assert_eq!(Selector::parse(raw).unwrap().to_string(), raw);
        }
    }
}
