//! Canonical JSON serialization.
//!
//! Object keys are sorted recursively so that documents differing only in key
//! order serialize identically. Array order is significant and kept.

use serde::Serialize;
use serde_json::Value;

/// Rebuild a value with all object keys sorted.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Serialize any value to its canonical JSON text.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&canonicalize(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    #[test]
    fn ignores_key_order() {
        let mut a: IndexMap<String, Value> = IndexMap::new();
        a.insert("size".to_string(), json!("md"));
        a.insert("variant".to_string(), json!({"b": 1, "a": 2}));

        let mut b: IndexMap<String, Value> = IndexMap::new();
        b.insert("variant".to_string(), json!({"a": 2, "b": 1}));
        b.insert("size".to_string(), json!("md"));

        assert_eq!(to_canonical_string(&a).unwrap(), to_canonical_string(&b).unwrap());
    }

    #[test]
    fn keeps_array_order() {
        let a = to_canonical_string(&json!([1, 2])).unwrap();
        let b = to_canonical_string(&json!([2, 1])).unwrap();

        assert_ne!(a, b);
    }
}
