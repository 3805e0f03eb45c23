// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sanitization of live-feed change payloads.
//!
//! Change payloads arrive as a variant tree rather than plain JSON. Before a
//! record can be decoded, the tree is normalized into a `serde_json::Value`:
//! scalar wrappers unwrap to native numbers, arrays and objects recurse, and
//! a value JSON cannot represent degrades to its string form instead of
//! failing the event.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A loosely-typed value from the live-feed wire format.
///
/// Untagged, so a raw envelope decodes straight into it: JSON null maps to
/// `Null`, integers prefer `Int` over `Float`, and nesting is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<FeedValue>),
    Object(BTreeMap<String, FeedValue>),
}

impl FeedValue {
    /// Convenience constructor for object trees in tests and transports.
    pub fn object(fields: impl IntoIterator<Item = (&'static str, FeedValue)>) -> Self {
        FeedValue::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }
}

impl From<&str> for FeedValue {
    fn from(s: &str) -> Self {
        FeedValue::Str(s.to_string())
    }
}

impl From<i64> for FeedValue {
    fn from(n: i64) -> Self {
        FeedValue::Int(n)
    }
}

impl From<f64> for FeedValue {
    fn from(n: f64) -> Self {
        FeedValue::Float(n)
    }
}

impl From<bool> for FeedValue {
    fn from(b: bool) -> Self {
        FeedValue::Bool(b)
    }
}

/// Recursively normalize a feed value into a plain JSON tree.
///
/// The result contains no wrapper variants and is decodable by a standard
/// JSON decoder into the typed record types.
pub fn sanitize(value: FeedValue) -> Value {
    match value {
        FeedValue::Null => Value::Null,
        FeedValue::Bool(b) => Value::Bool(b),
        FeedValue::Int(n) => Value::Number(Number::from(n)),
        FeedValue::Float(n) => match Number::from_f64(n) {
            Some(number) => Value::Number(number),
            // NaN and infinities have no JSON form; keep the value as text.
            None => Value::String(n.to_string()),
        },
        FeedValue::Str(s) => Value::String(s),
        FeedValue::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        FeedValue::Object(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (key, field) in fields {
                map.insert(key, sanitize(field));
            }
            Value::Object(map)
        }
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
