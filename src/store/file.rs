//! YAML file-backed variable store
//!
//! Every `get` and `set` goes back to disk so edits made between calls (by
//! hand or by another tool) are always visible. The file must already exist;
//! a missing file is reported as [`Error::StoreNotFound`], which is different
//! from a missing key inside it.
//!
//! Paths can only name string keys, so scalar mapping keys such as
//! `ids: {1001: a}` are read as strings (`ids.1001`) and written back
//! quoted. Null, sequence and mapping keys are rejected.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{insert, lookup, VariableStore};
use crate::common::{Error, Result};

/// Variable store persisted as a YAML document
#[derive(Debug, Clone)]
pub struct YamlFileStore {
    path: PathBuf,
}

impl YamlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Value> {
        if !self.path.exists() {
            return Err(Error::store_not_found(&self.path));
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| Error::FileRead {
            path: self.path.display().to_string(),
            error: e.to_string(),
        })?;

        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let raw: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| Error::store_parse(&self.path, e))?;
        let doc = to_json(raw).map_err(|message| Error::store_parse(&self.path, message))?;

        match doc {
            Value::Null => Ok(Value::Object(Map::new())),
            Value::Object(_) => Ok(doc),
            _ => Err(Error::store_parse(
                &self.path,
                "top level must be a mapping",
            )),
        }
    }

    fn write_document(&self, doc: &Value) -> Result<()> {
        let text = serde_yaml::to_string(doc)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

/// Convert a YAML document into the store's JSON tree
fn to_json(value: serde_yaml::Value) -> std::result::Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| format!("unsupported number {}", n))?
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(to_json)
                .collect::<std::result::Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => {
                        return Err(format!(
                            "unsupported mapping key {}",
                            serde_yaml::to_string(&other)
                                .map(|k| k.trim_end().to_string())
                                .unwrap_or_else(|_| format!("{:?}", other))
                        ))
                    }
                };
                map.insert(key, to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => to_json(tagged.value)?,
    })
}

impl VariableStore for YamlFileStore {
    fn get(&self, path: &str) -> Result<Option<Value>> {
        let doc = self.read_document()?;
        Ok(lookup(&doc, path).cloned())
    }

    fn set(&mut self, path: &str, value: Value) -> Result<()> {
        let mut doc = self.read_document()?;
        insert(&mut doc, path, value)?;
        self.write_document(&doc)
    }

    fn snapshot(&self) -> Result<Value> {
        self.read_document()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with(content: &str) -> (TempDir, YamlFileStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_vars.yaml");
        std::fs::write(&path, content).unwrap();
        (dir, YamlFileStore::new(path))
    }

    #[test]
    fn test_missing_file_is_store_not_found() {
        let dir = TempDir::new().unwrap();
        let store = YamlFileStore::new(dir.path().join("nope.yaml"));
        assert!(matches!(
            store.get("global.token"),
            Err(Error::StoreNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_file_on_set() {
        let dir = TempDir::new().unwrap();
        let mut store = YamlFileStore::new(dir.path().join("nope.yaml"));
        assert!(matches!(
            store.set("global.token", json!("t")),
            Err(Error::StoreNotFound { .. })
        ));
        assert!(!dir.path().join("nope.yaml").exists());
    }

    #[test]
    fn test_empty_file_is_empty_mapping() {
        let (_dir, store) = store_with("");
        assert_eq!(store.get("global.token").unwrap(), None);
        assert_eq!(store.snapshot().unwrap(), json!({}));
    }

    #[test]
    fn test_get_existing_and_absent() {
        let (_dir, store) = store_with("user:\n  username: '13800000000'\n  smsCode: '123456'\n");
        assert_eq!(
            store.get("user.username").unwrap(),
            Some(json!("13800000000"))
        );
        assert_eq!(store.get("global.token").unwrap(), None);
        assert_eq!(store.get("user.username.deeper").unwrap(), None);
    }

    #[test]
    fn test_set_persists_and_creates_levels() {
        let (dir, mut store) = store_with("user:\n  username: u\n");
        store.set("global.token", json!("abc123xyz")).unwrap();
        store.set("global.user_id", json!(42)).unwrap();

        // A fresh handle sees the write
        let reopened = YamlFileStore::new(dir.path().join("user_vars.yaml"));
        assert_eq!(
            reopened.get("global.token").unwrap(),
            Some(json!("abc123xyz"))
        );
        assert_eq!(reopened.get("global.user_id").unwrap(), Some(json!(42)));
        assert_eq!(reopened.get("user.username").unwrap(), Some(json!("u")));
    }

    #[test]
    fn test_external_edits_visible() {
        let (dir, store) = store_with("global:\n  token: old\n");
        assert_eq!(store.get("global.token").unwrap(), Some(json!("old")));
        std::fs::write(dir.path().join("user_vars.yaml"), "global:\n  token: new\n").unwrap();
        assert_eq!(store.get("global.token").unwrap(), Some(json!("new")));
    }

    #[test]
    fn test_write_preserves_order_and_unicode() {
        let (dir, mut store) = store_with("zeta: 1\nalpha: 2\nglobal:\n  token: t\n");
        store.set("global.name", json!("张三")).unwrap();
        store.set("alpha", json!(3)).unwrap();

        let text = std::fs::read_to_string(dir.path().join("user_vars.yaml")).unwrap();
        let zeta = text.find("zeta").unwrap();
        let alpha = text.find("alpha").unwrap();
        let global = text.find("global").unwrap();
        assert!(zeta < alpha && alpha < global);
        assert!(text.contains("张三"));
        assert!(text.contains("alpha: 3"));
    }

    #[test]
    fn test_non_mapping_document_rejected() {
        let (_dir, store) = store_with("- a\n- b\n");
        assert!(matches!(
            store.get("global.token"),
            Err(Error::StoreParse { .. })
        ));
    }

    #[test]
    fn test_numeric_keys_read_as_strings() {
        let (dir, mut store) = store_with("ids:\n  1001: a\n  true: b\n");
        assert_eq!(store.get("ids.1001").unwrap(), Some(json!("a")));
        assert_eq!(store.get("ids.true").unwrap(), Some(json!("b")));

        // The file stays usable for writes
        store.set("global.token", json!("t")).unwrap();
        let reopened = YamlFileStore::new(dir.path().join("user_vars.yaml"));
        assert_eq!(reopened.get("ids.1001").unwrap(), Some(json!("a")));
        assert_eq!(reopened.get("global.token").unwrap(), Some(json!("t")));
    }

    #[test]
    fn test_complex_key_names_the_key() {
        let (_dir, store) = store_with("ids:\n  ? [1, 2]\n  : a\n");
        match store.get("ids") {
            Err(Error::StoreParse { message, .. }) => {
                assert!(message.contains("unsupported mapping key"), "{}", message)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
