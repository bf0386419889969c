//! Template leaves and their resolution
//!
//! Case data is parsed once into [`TemplateLeaf`] values: either a literal or
//! a `${name}` reference. References resolve against `global.<name>` in the
//! state store, then against `<name>` in the fixture store.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::common::{mask_secret, Error, Result};
use crate::store::{global_path, is_set, VariableStore};

/// A scalar position in a request or expectation that may reference a variable
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateLeaf {
    Literal(Value),
    Reference(String),
}

impl TemplateLeaf {
    /// Classify a raw value; only a string of the exact form `${name}` is a reference
    pub fn parse(value: Value) -> Self {
        if let Value::String(s) = &value {
            if let Some(name) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
                if !name.is_empty() {
                    return TemplateLeaf::Reference(name.to_string());
                }
            }
        }
        TemplateLeaf::Literal(value)
    }

    /// The value as written in the case file
    pub fn original(&self) -> Value {
        match self {
            TemplateLeaf::Literal(value) => value.clone(),
            TemplateLeaf::Reference(name) => Value::String(format!("${{{}}}", name)),
        }
    }
}

impl From<Value> for TemplateLeaf {
    fn from(value: Value) -> Self {
        Self::parse(value)
    }
}

/// Ordered mapping of keys to template leaves, resolved one level deep
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct TemplateMap(Vec<(String, TemplateLeaf)>);

impl From<Map<String, Value>> for TemplateMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(key, value)| (key, TemplateLeaf::parse(value)))
                .collect(),
        )
    }
}

impl TemplateMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TemplateLeaf)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Resolves template leaves against the run's stores
pub struct Resolver<'a> {
    state: &'a dyn VariableStore,
    fixtures: Option<&'a dyn VariableStore>,
}

impl<'a> Resolver<'a> {
    pub fn new(state: &'a dyn VariableStore, fixtures: Option<&'a dyn VariableStore>) -> Self {
        Self { state, fixtures }
    }

    /// Look up a referenced name: `global.<name>` first, then the fixture `<name>`
    ///
    /// A stored null counts as absent in both stores.
    pub fn lookup(&self, name: &str) -> Result<Option<Value>> {
        let value = self.state.get(&global_path(name))?.filter(|v| !v.is_null());
        if value.is_some() {
            return Ok(value);
        }
        match self.fixtures {
            Some(fixtures) => Ok(fixtures.get(name)?.filter(|v| !v.is_null())),
            None => Ok(None),
        }
    }

    /// Resolve one leaf; an unresolved reference keeps its `${name}` text
    ///
    /// Variables a group cannot run without are checked up front with
    /// [`Resolver::require`] instead.
    pub fn resolve(&self, leaf: &TemplateLeaf) -> Result<Value> {
        match leaf {
            TemplateLeaf::Literal(value) => Ok(value.clone()),
            TemplateLeaf::Reference(name) => match self.lookup(name)? {
                Some(value) => Ok(value),
                None => {
                    warn!("Variable '{}' is not set, keeping the original value", name);
                    Ok(leaf.original())
                }
            },
        }
    }

    /// Resolve every top-level leaf of a map; `site` names it in log lines
    pub fn resolve_map(&self, map: &TemplateMap, site: &str) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        for (key, leaf) in map.iter() {
            let value = self.resolve(leaf)?;
            if let TemplateLeaf::Reference(name) = leaf {
                if value != leaf.original() {
                    info!("Substituted {} variable: {} = ${{{}}} -> {}", site, key, name, value);
                }
            }
            out.insert(key.to_string(), value);
        }
        Ok(out)
    }

    /// Require `global.<name>` to be set, e.g. the auth token
    pub fn require(&self, name: &str) -> Result<Value> {
        let value = self.state.get(&global_path(name))?;
        if !is_set(value.as_ref()) {
            return Err(Error::missing_precondition(
                &global_path(name),
                "Run the group that produces it first, or set it in the variable store",
            ));
        }
        let value = value.unwrap_or(Value::Null);
        if let Value::String(s) = &value {
            info!("Precondition '{}' present: {}", name, mask_secret(s, 10));
        }
        Ok(value)
    }

    /// Require a fixture path (e.g. `user.username`) to be set
    pub fn require_fixture(&self, path: &str) -> Result<Value> {
        let value = match self.fixtures {
            Some(fixtures) => fixtures.get(path)?,
            None => None,
        };
        match value {
            Some(value) if is_set(Some(&value)) => Ok(value),
            _ => Err(Error::missing_precondition(
                path,
                "Add it to the fixtures file",
            )),
        }
    }
}
