//! Variable store
//!
//! A nested mapping addressed by dotted paths such as `global.token`. Cases
//! read from it when resolving `${name}` references and write to it when
//! extracting values from responses.

mod file;
mod memory;

pub use file::YamlFileStore;
pub use memory::MemoryStore;

use serde_json::{Map, Value};

use crate::common::{Error, Result};

/// Namespace that extracted and referenced variables live under
pub const GLOBAL_SCOPE: &str = "global";

/// Path of a shared variable, e.g. `token` -> `global.token`
pub fn global_path(name: &str) -> String {
    format!("{}.{}", GLOBAL_SCOPE, name)
}

/// Dotted-path key-value storage
///
/// `get` on a path that runs through a missing key or a non-mapping value
/// yields `Ok(None)`. Errors are reserved for problems with the backing
/// storage itself.
pub trait VariableStore: Send {
    /// Read the value at `path`
    fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Write `value` at `path`, creating intermediate mappings as needed
    fn set(&mut self, path: &str, value: Value) -> Result<()>;

    /// The whole document
    fn snapshot(&self) -> Result<Value>;

    /// Human-readable location, used in log lines
    fn describe(&self) -> String;
}

/// Whether a stored value counts as set: null and empty strings do not
pub fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Walk `path` through nested mappings
pub(crate) fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Write `value` at `path` inside `root`
///
/// Any non-mapping value found on the way (including `root` itself) is
/// replaced by an empty mapping. Existing keys keep their position.
pub(crate) fn insert(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let keys: Vec<&str> = path.split('.').collect();
    if keys.iter().any(|k| k.is_empty()) {
        return Err(Error::InvalidPath(path.to_string()));
    }
    insert_at(root, &keys, value);
    Ok(())
}

fn insert_at(node: &mut Value, keys: &[&str], value: Value) {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        match keys {
            [last] => {
                map.insert((*last).to_string(), value);
            }
            [first, rest @ ..] => {
                let child = map.entry((*first).to_string()).or_insert(Value::Null);
                insert_at(child, rest, value);
            }
            [] => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let doc = json!({"global": {"token": "abc", "n": 1}});
        assert_eq!(lookup(&doc, "global.token"), Some(&json!("abc")));
        assert_eq!(lookup(&doc, "global"), Some(&json!({"token": "abc", "n": 1})));
    }

    #[test]
    fn test_lookup_missing_is_none() {
        let doc = json!({"global": {"token": "abc"}});
        assert_eq!(lookup(&doc, "global.missing"), None);
        assert_eq!(lookup(&doc, "other.token"), None);
        // Through a scalar
        assert_eq!(lookup(&doc, "global.token.inner"), None);
        // Empty document
        assert_eq!(lookup(&Value::Null, "global.token"), None);
    }

    #[test]
    fn test_insert_creates_levels() {
        let mut doc = json!({});
        insert(&mut doc, "a.b.c", json!(1)).unwrap();
        assert_eq!(doc, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_insert_overwrites_scalar_on_the_way() {
        let mut doc = json!({"a": "scalar"});
        insert(&mut doc, "a.b", json!(true)).unwrap();
        assert_eq!(doc, json!({"a": {"b": true}}));
    }

    #[test]
    fn test_insert_into_null_root() {
        let mut doc = Value::Null;
        insert(&mut doc, "global.token", json!("t")).unwrap();
        assert_eq!(lookup(&doc, "global.token"), Some(&json!("t")));
    }

    #[test]
    fn test_insert_keeps_key_order() {
        let mut doc = json!({"first": 1, "second": 2, "third": 3});
        insert(&mut doc, "second", json!(20)).unwrap();
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["first", "second", "third"]);
        assert_eq!(doc["second"], json!(20));
    }

    #[test]
    fn test_insert_rejects_empty_segments() {
        let mut doc = json!({});
        assert!(matches!(
            insert(&mut doc, "", json!(1)),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            insert(&mut doc, "a..b", json!(1)),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_is_set() {
        assert!(!is_set(None));
        assert!(!is_set(Some(&Value::Null)));
        assert!(!is_set(Some(&json!(""))));
        assert!(is_set(Some(&json!("abc"))));
        assert!(is_set(Some(&json!(0))));
    }

    #[test]
    fn test_global_path() {
        assert_eq!(global_path("token"), "global.token");
    }
}
