//! Unique index structures.
//!
//! Index keys are totally ordered: Null < Bool < Int < Float < String.
//! Floats are stored as order-preserving bit patterns so the derived
//! ordering is deterministic.

use std::collections::BTreeMap;

use serde_json::Value;

use super::document::Document;
use super::errors::{EngineError, EngineResult};

/// A single serialized field value inside an index key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Missing field (missing values still participate in uniqueness)
    Null,
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    /// String value
    String(String),
}

impl IndexKey {
    /// Create a key from a float, using an order-preserving bit encoding.
    pub fn from_float(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits // Negative: flip all bits
        } else {
            bits ^ (1 << 63) // Positive: flip sign bit
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from a scalar JSON value.
    ///
    /// Arrays and objects have no scalar key; callers fan arrays out into
    /// one key per element before reaching this point.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(IndexKey::Int(i))
                } else {
                    n.as_f64().map(IndexKey::from_float)
                }
            }
            Value::String(s) => Some(IndexKey::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Sort direction / kind for one key of an index specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrder {
    /// Ascending scalar key
    Ascending,
    /// Text key (string-typed field)
    Text,
}

/// Declarative index specification handed to collection creation.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    /// Ordered key paths; dotted paths descend into nested documents and
    /// fan out over arrays (multikey).
    pub keys: Vec<(String, IndexOrder)>,
    /// Whether the composite key must be unique across documents.
    pub unique: bool,
}

impl IndexSpec {
    /// Derived index name, MongoDB style: `field_1_other_text`.
    pub fn name(&self) -> String {
        let parts: Vec<String> = self
            .keys
            .iter()
            .map(|(path, order)| match order {
                IndexOrder::Ascending => format!("{path}_1"),
                IndexOrder::Text => format!("{path}_text"),
            })
            .collect();
        parts.join("_")
    }
}

/// One live unique index over a collection.
///
/// Entries map composite key tuples to the owning document id. Array-valued
/// key paths contribute one tuple per element, so a single document may own
/// many entries.
#[derive(Debug, Clone)]
pub struct UniqueIndex {
    name: String,
    key_paths: Vec<String>,
    entries: BTreeMap<Vec<IndexKey>, String>,
}

impl UniqueIndex {
    /// Builds an empty index from its specification.
    pub fn from_spec(spec: &IndexSpec) -> Self {
        Self {
            name: spec.name(),
            key_paths: spec.keys.iter().map(|(path, _)| path.clone()).collect(),
            entries: BTreeMap::new(),
        }
    }

    /// Index name for error reporting.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Computes every composite key tuple a document contributes.
    pub fn tuples_for(&self, doc: &Document) -> Vec<Vec<IndexKey>> {
        let per_path: Vec<Vec<IndexKey>> = self
            .key_paths
            .iter()
            .map(|path| extract_keys(doc, path))
            .collect();
        cartesian(&per_path)
    }

    /// Checks whether inserting `doc` under `doc_id` would collide with an
    /// entry owned by a different document.
    pub fn check(&self, doc: &Document, doc_id: &str, collection: &str) -> EngineResult<()> {
        for tuple in self.tuples_for(doc) {
            if let Some(owner) = self.entries.get(&tuple) {
                if owner != doc_id {
                    return Err(EngineError::DuplicateKey {
                        collection: collection.to_string(),
                        index: self.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Registers a document's entries. Call only after `check` passed.
    pub fn insert(&mut self, doc: &Document, doc_id: &str) {
        for tuple in self.tuples_for(doc) {
            self.entries.insert(tuple, doc_id.to_string());
        }
    }

    /// Removes every entry owned by `doc_id` for the given document image.
    pub fn remove(&mut self, doc: &Document, doc_id: &str) {
        for tuple in self.tuples_for(doc) {
            if self.entries.get(&tuple).is_some_and(|owner| owner == doc_id) {
                self.entries.remove(&tuple);
            }
        }
    }
}

/// Extracts the key values a dotted path yields for a document.
///
/// A missing segment yields a single Null key. An array segment fans out
/// into one key per element (descending into elements for the remaining
/// path segments).
fn extract_keys(doc: &Document, path: &str) -> Vec<IndexKey> {
    fn walk(value: &Value, segments: &[&str], out: &mut Vec<IndexKey>) {
        match segments.split_first() {
            None => match value {
                Value::Array(items) => {
                    for item in items {
                        if let Some(key) = IndexKey::from_json(item) {
                            out.push(key);
                        }
                    }
                    if items.is_empty() {
                        out.push(IndexKey::Null);
                    }
                }
                other => {
                    if let Some(key) = IndexKey::from_json(other) {
                        out.push(key);
                    } else {
                        out.push(IndexKey::Null);
                    }
                }
            },
            Some((head, rest)) => match value {
                Value::Object(map) => match map.get(*head) {
                    Some(inner) => walk(inner, rest, out),
                    None => out.push(IndexKey::Null),
                },
                Value::Array(items) => {
                    if items.is_empty() {
                        out.push(IndexKey::Null);
                    }
                    for item in items {
                        walk(item, segments, out);
                    }
                }
                _ => out.push(IndexKey::Null),
            },
        }
    }

    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    walk(&Value::Object(doc.clone()), &segments, &mut out);
    if out.is_empty() {
        out.push(IndexKey::Null);
    }
    out
}

/// Cartesian product of the per-path key lists.
fn cartesian(per_path: &[Vec<IndexKey>]) -> Vec<Vec<IndexKey>> {
    let mut result: Vec<Vec<IndexKey>> = vec![Vec::new()];
    for keys in per_path {
        let mut next = Vec::with_capacity(result.len() * keys.len());
        for prefix in &result {
            for key in keys {
                let mut tuple = prefix.clone();
                tuple.push(key.clone());
                next.push(tuple);
            }
        }
        result = next;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn index(paths: &[&str]) -> UniqueIndex {
        UniqueIndex::from_spec(&IndexSpec {
            keys: paths.iter().map(|p| (p.to_string(), IndexOrder::Ascending)).collect(),
            unique: true,
        })
    }

    #[test]
    fn test_float_key_total_order() {
        assert!(IndexKey::from_float(-2.0) < IndexKey::from_float(-1.0));
        assert!(IndexKey::from_float(-1.0) < IndexKey::from_float(0.0));
        assert!(IndexKey::from_float(0.0) < IndexKey::from_float(1.5));
    }

    #[test]
    fn test_composite_duplicate_detected() {
        let mut idx = index(&["a", "b"]);
        let first = doc(json!({"_id": "d1", "a": 1, "b": "x"}));
        idx.check(&first, "d1", "c").unwrap();
        idx.insert(&first, "d1");

        let same = doc(json!({"_id": "d2", "a": 1, "b": "x"}));
        assert!(matches!(
            idx.check(&same, "d2", "c"),
            Err(EngineError::DuplicateKey { .. })
        ));

        let different = doc(json!({"_id": "d3", "a": 1, "b": "y"}));
        idx.check(&different, "d3", "c").unwrap();
    }

    #[test]
    fn test_missing_field_indexes_as_null() {
        let mut idx = index(&["a"]);
        let first = doc(json!({"_id": "d1"}));
        idx.insert(&first, "d1");

        let second = doc(json!({"_id": "d2"}));
        assert!(idx.check(&second, "d2", "c").is_err());
    }

    #[test]
    fn test_multikey_path_fans_out() {
        let mut idx = index(&["_id", "history.history_id"]);
        let first = doc(json!({
            "_id": "d1",
            "history": [{"history_id": "h1"}, {"history_id": "h2"}]
        }));
        assert_eq!(idx.tuples_for(&first).len(), 2);
        idx.insert(&first, "d1");

        // Same history_id under a different _id is a different tuple.
        let other = doc(json!({"_id": "d2", "history": [{"history_id": "h1"}]}));
        idx.check(&other, "d2", "c").unwrap();
    }

    #[test]
    fn test_remove_frees_tuples() {
        let mut idx = index(&["a"]);
        let first = doc(json!({"_id": "d1", "a": 7}));
        idx.insert(&first, "d1");
        idx.remove(&first, "d1");

        let second = doc(json!({"_id": "d2", "a": 7}));
        assert!(idx.check(&second, "d2", "c").is_ok());
    }

    #[test]
    fn test_index_name_mongo_style() {
        let spec = IndexSpec {
            keys: vec![
                ("int_field".to_string(), IndexOrder::Ascending),
                ("string_field".to_string(), IndexOrder::Text),
            ],
            unique: true,
        };
        assert_eq!(spec.name(), "int_field_1_string_field_text");
    }
}
