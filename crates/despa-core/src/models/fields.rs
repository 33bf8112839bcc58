//! Extracted field maps.
//!
//! Field maps come either from coordinate extraction (flat label -> text) or
//! from an LLM extraction step (arbitrary nested JSON). Both are held as JSON
//! values and read through dot-paths.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Mapping from field names to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(Map<String, Value>);

impl FieldMap {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Load a field map from a JSON object file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Resolve a dot-separated path (`"client.name"`).
    ///
    /// Missing keys, JSON nulls and paths that run through a scalar all resolve
    /// to `None`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                _ => return None,
            };
        }

        (!current.is_null()).then_some(current)
    }
}

impl From<Map<String, Value>> for FieldMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<BTreeMap<String, String>> for FieldMap {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self(
            fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        )
    }
}

impl From<FieldMap> for Value {
    fn from(fields: FieldMap) -> Self {
        Value::Object(fields.0)
    }
}

/// Text form of a value used for comparison: strings as-is, everything else
/// as its JSON rendering.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> FieldMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_nested_path() {
        let fields = map(json!({"a": {"b": 5}}));
        assert_eq!(fields.get_path("a.b"), Some(&json!(5)));
    }

    #[test]
    fn test_path_through_scalar() {
        let fields = map(json!({"a": 5}));
        assert_eq!(fields.get_path("a.b"), None);
    }

    #[test]
    fn test_missing_and_null() {
        let fields = map(json!({"a": {"b": null}, "c": "x"}));
        assert_eq!(fields.get_path("a.b"), None);
        assert_eq!(fields.get_path("missing"), None);
        assert_eq!(fields.get_path("a.b.c"), None);
        assert_eq!(fields.get_path("c"), Some(&json!("x")));
    }

    #[test]
    fn test_path_returns_subtree() {
        let fields = map(json!({"client": {"name": "ACME", "tax_id": "30-1"}}));
        assert_eq!(
            fields.get_path("client"),
            Some(&json!({"name": "ACME", "tax_id": "30-1"}))
        );
    }

    #[test]
    fn test_from_flat_extraction() {
        let mut flat = BTreeMap::new();
        flat.insert("total".to_string(), "1.234,56".to_string());
        let fields = FieldMap::from(flat);

        assert_eq!(fields.get_path("total"), Some(&json!("1.234,56")));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("ABC")), "ABC");
        assert_eq!(value_text(&json!(12.5)), "12.5");
        assert_eq!(value_text(&json!(7)), "7");
        assert_eq!(value_text(&json!(true)), "true");
    }
}
