//! Variable extraction from response bodies
//!
//! Each rule maps a variable name to a path query. The first match is stored
//! under `global.<name>`; a query without matches is logged and skipped.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::common::Result;
use crate::jsonpath::PathQuery;
use crate::store::{global_path, VariableStore};

/// Ordered `name -> query` rules from a case's `extract` block
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ExtractRules(Vec<(String, String)>);

impl TryFrom<Map<String, Value>> for ExtractRules {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        map.into_iter()
            .map(|(name, query)| match query {
                Value::String(query) => Ok((name, query)),
                other => Err(format!(
                    "extract rule '{}' must be a path query string, got {}",
                    name, other
                )),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl ExtractRules {
    pub fn new(rules: Vec<(String, String)>) -> Self {
        Self(rules)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, q)| (n.as_str(), q.as_str()))
    }
}

/// What an extraction pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionReport {
    /// Variables written, in rule order
    pub extracted: Vec<(String, Value)>,
    /// Variables whose query matched nothing
    pub missed: Vec<String>,
}

/// Apply `rules` to `body`, writing first matches into `store`
///
/// Only an invalid query or a store failure is an error; a query with no
/// matches leaves the variable untouched.
pub fn extract_variables(
    store: &mut dyn VariableStore,
    body: &Value,
    rules: &ExtractRules,
) -> Result<ExtractionReport> {
    let mut report = ExtractionReport::default();

    for (name, expression) in rules.iter() {
        let query = PathQuery::parse(expression)?;
        let matches = query.evaluate(body);

        let Some(first) = matches.first() else {
            warn!("Extraction missed: {} (query: {})", name, query);
            report.missed.push(name.to_string());
            continue;
        };

        if matches.len() > 1 {
            debug!(
                "Query {} matched {} values for '{}', keeping the first",
                query,
                matches.len(),
                name
            );
        }

        let value = (*first).clone();
        store.set(&global_path(name), value.clone())?;
        info!("Extracted variable: {} = {}", name, value);
        report.extracted.push((name.to_string(), value));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn rules(pairs: &[(&str, &str)]) -> ExtractRules {
        ExtractRules::new(
            pairs
                .iter()
                .map(|(n, q)| (n.to_string(), q.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_extracts_first_match() {
        let mut store = MemoryStore::new();
        let body = json!({"data": {"orders": [{"id": "A1"}, {"id": "A2"}]}});
        let report =
            extract_variables(&mut store, &body, &rules(&[("order_id", "$..id")])).unwrap();

        assert_eq!(store.get("global.order_id").unwrap(), Some(json!("A1")));
        assert_eq!(report.extracted, vec![("order_id".to_string(), json!("A1"))]);
        assert!(report.missed.is_empty());
    }

    #[test]
    fn test_zero_matches_leave_store_untouched() {
        let mut store = MemoryStore::from_value(json!({"global": {"order_id": "old"}}));
        let body = json!({"data": {}});
        let report =
            extract_variables(&mut store, &body, &rules(&[("order_id", "$.data.orderId")]))
                .unwrap();

        assert_eq!(store.get("global.order_id").unwrap(), Some(json!("old")));
        assert_eq!(report.missed, vec!["order_id".to_string()]);
        assert!(report.extracted.is_empty());
    }

    #[test]
    fn test_login_response_extraction() {
        let mut store = MemoryStore::new();
        let body = json!({"code": "0000", "data": {"token": "abc123xyz", "userId": 42}});
        extract_variables(
            &mut store,
            &body,
            &rules(&[("token", "$.data.token"), ("user_id", "$.data.userId")]),
        )
        .unwrap();

        assert_eq!(store.get("global.token").unwrap(), Some(json!("abc123xyz")));
        assert_eq!(store.get("global.user_id").unwrap(), Some(json!(42)));
    }

    #[test]
    fn test_miss_does_not_stop_later_rules() {
        let mut store = MemoryStore::new();
        let body = json!({"b": 2});
        let report =
            extract_variables(&mut store, &body, &rules(&[("a", "$.a"), ("b", "$.b")])).unwrap();
        assert_eq!(report.missed, vec!["a".to_string()]);
        assert_eq!(store.get("global.b").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_invalid_query_is_error() {
        let mut store = MemoryStore::new();
        let err = extract_variables(&mut store, &json!({}), &rules(&[("x", "data.x")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn test_rules_from_yaml_keep_order() {
        let parsed: ExtractRules =
            serde_yaml::from_str("token: $.data.token\nuser_id: $.data.userId\n").unwrap();
        let names: Vec<&str> = parsed.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["token", "user_id"]);
    }

    #[test]
    fn test_non_string_rule_rejected() {
        let parsed: std::result::Result<ExtractRules, _> = serde_yaml::from_str("token: 3\n");
        assert!(parsed.is_err());
    }
}
