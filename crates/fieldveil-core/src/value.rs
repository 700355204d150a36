//! Generic tagged value tree for structured records
//!
//! Records are addressed as trees of [`FieldValue`]s. The map variant keeps
//! entries in insertion order so that traversal, transformation, and audit
//! sequencing are deterministic across runs, which is why this is not a
//! plain `BTreeMap` or `HashMap`.

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single field value of heterogeneous semantic type
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Explicit null
    Null,

    /// Boolean
    Bool(bool),

    /// Signed integer
    Int(i64),

    /// Floating point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Ordered sequence of values
    Seq(Vec<FieldValue>),

    /// Order-preserving map of field name to value
    Map(Vec<(String, FieldValue)>),
}

/// Coarse type of a field value, used by type-based selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Seq,
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Seq => "seq",
            ValueKind::Map => "map",
        };
        f.write_str(name)
    }
}

impl ValueKind {
    /// Parse a kind name as it appears in `type:` selectors
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "null" => Some(ValueKind::Null),
            "bool" | "boolean" => Some(ValueKind::Bool),
            "number" => Some(ValueKind::Number),
            "string" => Some(ValueKind::String),
            "seq" | "list" => Some(ValueKind::Seq),
            "map" => Some(ValueKind::Map),
            _ => None,
        }
    }
}

impl FieldValue {
    /// The coarse kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Null => ValueKind::Null,
            FieldValue::Bool(_) => ValueKind::Bool,
            FieldValue::Int(_) | FieldValue::Float(_) => ValueKind::Number,
            FieldValue::String(_) => ValueKind::String,
            FieldValue::Seq(_) => ValueKind::Seq,
            FieldValue::Map(_) => ValueKind::Map,
        }
    }

    /// Whether this is a leaf (non-container) value
    pub fn is_leaf(&self) -> bool {
        !matches!(self, FieldValue::Seq(_) | FieldValue::Map(_))
    }

    /// Borrow the string content, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render a leaf value as text for matching and transformation.
    ///
    /// Containers return `None`; actions operate on leaves only.
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Seq(_) | FieldValue::Map(_) => None,
        }
    }

    /// Look up a direct child by map key
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Int(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) => serializer.serialize_f64(*f),
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FieldValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a structured field value")
    }

    fn visit_unit<E>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_none<E>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FieldValue, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }

    fn visit_bool<E>(self, v: bool) -> Result<FieldValue, E> {
        Ok(FieldValue::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<FieldValue, E> {
        if v <= i64::MAX as u64 {
            Ok(FieldValue::Int(v as i64))
        } else {
            Ok(FieldValue::Float(v as f64))
        }
    }

    fn visit_f64<E>(self, v: f64) -> Result<FieldValue, E> {
        Ok(FieldValue::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<FieldValue, E> {
        Ok(FieldValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<FieldValue, A::Error> {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(FieldValue::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldValue, A::Error> {
        let mut entries: Vec<(String, FieldValue)> =
            Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, FieldValue>()? {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(de::Error::custom(format!("duplicate field '{key}'")));
            }
            entries.push((key, value));
        }
        Ok(FieldValue::Map(entries))
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<FieldValue, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_order_survives_json_round_trip() {
        let json = r#"{"zeta": 1, "alpha": {"b": true, "a": null}, "mid": [1, 2.5, "x"]}"#;
        let value: FieldValue = serde_json::from_str(json).unwrap();

        match &value {
            FieldValue::Map(entries) => {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
            }
            other => panic!("expected map, got {other:?}"),
        }

        let back = serde_json::to_string(&value).unwrap();
        let reparsed: FieldValue = serde_json::from_str(&back).unwrap();
        assert_eq!(value, reparsed);
    }

    #[test]
    fn duplicate_keys_rejected() {
        let json = r#"{"a": 1, "a": 2}"#;
        assert!(serde_json::from_str::<FieldValue>(json).is_err());
    }

    #[test]
    fn kind_classification() {
        assert_eq!(FieldValue::Int(3).kind(), ValueKind::Number);
        assert_eq!(FieldValue::Float(3.0).kind(), ValueKind::Number);
        assert_eq!(FieldValue::from("x").kind(), ValueKind::String);
        assert!(FieldValue::from("x").is_leaf());
        assert!(!FieldValue::Map(vec![]).is_leaf());
    }

    #[test]
    fn yaml_deserializes_into_value_tree() {
        let yaml = "user:\n  name: jane\n  age: 41\n";
        let value: FieldValue = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            value.get("user").and_then(|u| u.get("name")),
            Some(&FieldValue::from("jane"))
        );
    }
}
