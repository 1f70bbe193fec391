//! Runtime value model shared between queue payloads and stored records.
//!
//! [`Value`] is the JSON-compatible payload type carried by tasks and
//! results. [`Record`] is one stored item: a field-name to [`Value`] map
//! with conjunctive equality matching against a [`Filter`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Generic runtime value for task payloads and record fields.
///
/// Supports all JSON-compatible types plus binary data. Serializes
/// untagged so payloads appear as natural maps/arrays on the wire.
/// Map variants use `BTreeMap` for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON integer (signed 64-bit).
    Int(i64),
    /// JSON floating-point (64-bit IEEE 754).
    Float(f64),
    /// JSON string (UTF-8).
    String(String),
    /// JSON array (ordered sequence of values).
    Array(Vec<Value>),
    /// JSON object (ordered map of string keys to values).
    Map(BTreeMap<String, Value>),
    /// Binary data (not directly representable in JSON).
    ///
    /// Listed after `Array` so untagged deserialization prefers the
    /// sequence interpretation for plain arrays and falls back to bytes
    /// only for genuine binary input.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns the map entries if this value is a `Map`.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns the string slice if this value is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a `serde_json::Value` into a [`Value`].
    ///
    /// Numbers outside the `i64` range fall back to `Float`.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Value::Float(n.as_f64().unwrap_or(f64::NAN)), Value::Int),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts this value into a `serde_json::Value`.
    ///
    /// Bytes become an array of integers; non-finite floats become null
    /// (JSON has no representation for them).
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
            Value::Bytes(bytes) => {
                serde_json::Value::Array(bytes.into_iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

/// Conjunctive equality filter: every key must match the record field exactly.
///
/// No inequality, no OR. An empty filter matches every record.
pub type Filter = BTreeMap<String, Value>;

/// Builds a [`Filter`] from field/value pairs.
#[must_use]
pub fn filter_from_pairs<const N: usize>(pairs: [(&str, Value); N]) -> Filter {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// One stored item: an ordered mapping of field name to value.
///
/// Field order is deterministic (`BTreeMap`); the order of *records* within
/// a collection is the store's insertion order, tracked by the store itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from field/value pairs.
    #[must_use]
    pub fn from_pairs<const N: usize>(pairs: [(&str, Value); N]) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Seeds a new record from the fields of a filter.
    ///
    /// Used by `findOrCreate`: the created record carries exactly the
    /// filter's field values.
    #[must_use]
    pub fn from_filter(filter: &Filter) -> Self {
        Self {
            fields: filter.clone(),
        }
    }

    /// Returns the value of a field, or `None` if absent.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Returns `true` if every filter key matches the record's field exactly.
    ///
    /// An empty filter matches every record.
    #[must_use]
    pub fn matches(&self, filter: &Filter) -> bool {
        filter
            .iter()
            .all(|(field, expected)| self.fields.get(field) == Some(expected))
    }

    /// Number of fields in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the record's fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Map(record.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_any_record() {
        let record = Record::from_pairs([("id", Value::Int(1))]);
        assert!(record.matches(&Filter::new()));
        assert!(Record::new().matches(&Filter::new()));
    }

    #[test]
    fn filter_is_conjunctive_exact_equality() {
        let record = Record::from_pairs([("id", Value::Int(3)), ("v", Value::from("a"))]);

        assert!(record.matches(&filter_from_pairs([("v", Value::from("a"))])));
        assert!(record.matches(&filter_from_pairs([
            ("id", Value::Int(3)),
            ("v", Value::from("a")),
        ])));

        // One mismatching key fails the whole filter.
        assert!(!record.matches(&filter_from_pairs([
            ("id", Value::Int(3)),
            ("v", Value::from("b")),
        ])));
        // A key absent from the record never matches.
        assert!(!record.matches(&filter_from_pairs([("missing", Value::Null)])));
    }

    #[test]
    fn filter_equality_is_type_sensitive() {
        let record = Record::from_pairs([("id", Value::Int(1))]);
        assert!(!record.matches(&filter_from_pairs([("id", Value::from("1"))])));
        assert!(!record.matches(&filter_from_pairs([("id", Value::Float(1.0))])));
    }

    #[test]
    fn from_filter_seeds_all_fields() {
        let filter = filter_from_pairs([("id", Value::Int(5)), ("name", Value::from("web"))]);
        let record = Record::from_filter(&filter);

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("id"), Some(&Value::Int(5)));
        assert_eq!(record.get("name"), Some(&Value::from("web")));
        assert!(record.matches(&filter));
    }

    #[test]
    fn set_replaces_existing_field() {
        let mut record = Record::from_pairs([("name", Value::from("old"))]);
        record.set("name", Value::from("new"));
        assert_eq!(record.get("name"), Some(&Value::from("new")));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn json_conversion_preserves_structure() {
        let json = serde_json::json!({
            "services": ["a", "b"],
            "count": 2,
            "nested": { "ok": true },
        });

        let value = Value::from_json(json.clone());
        let Value::Map(entries) = &value else {
            panic!("expected map");
        };
        assert_eq!(
            entries.get("services"),
            Some(&Value::Array(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(entries.get("count"), Some(&Value::Int(2)));

        assert_eq!(value.into_json(), json);
    }
}
