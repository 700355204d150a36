//! Records and field-path addressing

use crate::value::FieldValue;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Dotted path addressing a field inside a record.
///
/// Map entries contribute their key as a segment, sequence elements their
/// index (`addresses.0.zip`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// The empty (root) path
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments
    pub fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Path segments in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, if any
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Extend the path with one more segment
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self {
            segments: s.split('.').map(str::to_string).collect(),
        })
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct FieldPathVisitor;

impl Visitor<'_> for FieldPathVisitor {
    type Value = FieldPath;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a dotted field path")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldPath, E> {
        Ok(FieldPath::from(v))
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<FieldPath, D::Error> {
        deserializer.deserialize_str(FieldPathVisitor)
    }
}

/// A structured record submitted for protection.
///
/// Transformation never mutates the caller's record; the engine returns a
/// new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Caller-supplied record identifier, used for audit correlation
    pub id: String,

    /// Root of the value tree
    pub root: FieldValue,
}

impl Record {
    /// Create an empty record
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            root: FieldValue::Map(Vec::new()),
        }
    }

    /// Create a record from an existing value tree
    pub fn with_root(id: impl Into<String>, root: FieldValue) -> Self {
        Self {
            id: id.into(),
            root,
        }
    }

    /// Parse a record body from JSON text
    pub fn from_json(id: impl Into<String>, json: &str) -> crate::Result<Self> {
        let root: FieldValue = serde_json::from_str(json)?;
        Ok(Self::with_root(id, root))
    }

    /// Insert or replace a top-level field, preserving insertion order
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        if let FieldValue::Map(entries) = &mut self.root {
            if let Some(entry) = entries.iter_mut().find(|(k, _)| *k == key) {
                entry.1 = value;
            } else {
                entries.push((key, value));
            }
        }
        self
    }

    /// Look up a field by dotted path
    pub fn get(&self, path: &FieldPath) -> Option<&FieldValue> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = match current {
                FieldValue::Map(entries) => {
                    entries.iter().find(|(k, _)| k == segment).map(|(_, v)| v)?
                }
                FieldValue::Seq(items) => {
                    let index: usize = segment.parse().ok()?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// All leaf fields in canonical depth-first, key-order-preserving order.
    ///
    /// This order defines audit event sequencing and must match the order
    /// the transformation engine visits fields in.
    pub fn walk(&self) -> Vec<(FieldPath, &FieldValue)> {
        let mut leaves = Vec::new();
        collect_leaves(&FieldPath::root(), &self.root, &mut leaves);
        leaves
    }
}

fn collect_leaves<'a>(
    path: &FieldPath,
    value: &'a FieldValue,
    out: &mut Vec<(FieldPath, &'a FieldValue)>,
) {
    match value {
        FieldValue::Map(entries) => {
            for (key, child) in entries {
                collect_leaves(&path.child(key.clone()), child, out);
            }
        }
        FieldValue::Seq(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_leaves(&path.child(index.to_string()), child, out);
            }
        }
        leaf => out.push((path.clone(), leaf)),
    }
}
