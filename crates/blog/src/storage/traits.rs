//! Storage trait definitions

use anyhow::Result;
use serde_json::Value;

/// Field holding a document's identifier
pub const ID_FIELD: &str = "_id";

/// Trait for primary document store operations
///
/// Documents are JSON objects grouped into named collections and keyed by
/// their `_id` field. Any error returned here is treated by the
/// reconciliation layer as the store being unavailable.
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Check that the store is reachable
    fn ping(&self) -> Result<()>;

    /// Return every document in a collection
    fn find_all(&self, collection: &str) -> Result<Vec<Value>>;

    /// Look up a document by id
    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Insert a document and return the id the store generated for it
    ///
    /// Any `_id` already present on the document is ignored.
    fn insert(&self, collection: &str, document: Value) -> Result<String>;

    /// Delete a document by id, returning whether it existed
    fn delete(&self, collection: &str, id: &str) -> Result<bool>;
}

/// Flatten an id value into a plain string
///
/// Accepts plain strings, numbers and extended-JSON `{"$oid": "..."}`
/// objects as returned by document databases.
pub fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id(&json!("abc")), Some("abc".into()));
        assert_eq!(normalize_id(&json!(17)), Some("17".into()));
        assert_eq!(
            normalize_id(&json!({"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"})),
            Some("65a1f0c2e4b0a1b2c3d4e5f6".into())
        );
        assert_eq!(normalize_id(&json!(null)), None);
        assert_eq!(normalize_id(&json!({"other": 1})), None);
    }
}
