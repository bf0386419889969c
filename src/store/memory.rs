//! In-process variable store

use serde_json::{Map, Value};

use super::{insert, lookup, VariableStore};
use crate::common::Result;

/// Variable store kept in memory for the duration of a run
#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: Value,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Start from an existing document
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore for MemoryStore {
    fn get(&self, path: &str) -> Result<Option<Value>> {
        Ok(lookup(&self.root, path).cloned())
    }

    fn set(&mut self, path: &str, value: Value) -> Result<()> {
        insert(&mut self.root, path, value)
    }

    fn snapshot(&self) -> Result<Value> {
        Ok(self.root.clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_then_get() {
        let mut store = MemoryStore::new();
        store.set("global.order_id", json!("A-1")).unwrap();
        assert_eq!(store.get("global.order_id").unwrap(), Some(json!("A-1")));
    }

    #[test]
    fn test_get_absent() {
        let store = MemoryStore::from_value(json!({"user": {"username": "u"}}));
        assert_eq!(store.get("global.token").unwrap(), None);
        assert_eq!(store.get("user.username.x").unwrap(), None);
    }

    #[test]
    fn test_structured_values() {
        let mut store = MemoryStore::new();
        store.set("global.items", json!([1, 2, 3])).unwrap();
        assert_eq!(store.get("global.items").unwrap(), Some(json!([1, 2, 3])));
        assert_eq!(
            store.snapshot().unwrap(),
            json!({"global": {"items": [1, 2, 3]}})
        );
    }
}
