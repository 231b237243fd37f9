//! Field paths into submission and answer-key documents
//!
//! Paths use dots between keys and brackets for positions:
//! `task_2.reserve_amount`, `scenarios[1].total_cost`, `[0].name`.
//! A bare numeric key (`items.0`) indexes an array when the node is an array
//! and looks up the literal key when it is an object.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{ConfigError, Result, Value};

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed, non-empty path. Resolution never fails: an absent node is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| ConfigError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for (part_idx, part) in trimmed.split('.').enumerate() {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }

            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if key.contains(']') {
                return Err(invalid("unexpected ']'"));
            }
            if key.is_empty() && (part_idx > 0 || rest.is_empty()) {
                return Err(invalid("empty segment"));
            }
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                if !rest.starts_with('[') {
                    return Err(invalid("expected '[' after index"));
                }
                let close = rest.find(']').ok_or_else(|| invalid("unterminated '['"))?;
                let digits = &rest[1..close];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("index must be a non-negative integer"));
                }
                let idx = digits
                    .parse::<usize>()
                    .map_err(|_| invalid("index out of range"))?;
                segments.push(Segment::Index(idx));
                rest = &rest[close + 1..];
            }
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk `root` along this path.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |node, segment| step(node, segment))
    }
}

fn step<'a>(node: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (node, segment) {
        (Value::Object(obj), Segment::Key(key)) => obj.get(key),
        (Value::Array(arr), Segment::Key(key)) => arr.get(key.parse::<usize>().ok()?),
        (Value::Array(arr), Segment::Index(idx)) => arr.get(*idx),
        (Value::Object(obj), Segment::Index(idx)) => obj.get(&idx.to_string()),
        _ => None,
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}
