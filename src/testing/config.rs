//! Test case data types
//!
//! Defines the data structures for deserializing YAML case files.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::extract::ExtractRules;
use crate::template::TemplateMap;

/// One test case record
#[derive(Deserialize, Debug, Clone)]
pub struct TestCase {
    /// Identifier shown in reports; filled in by the loader when omitted
    #[serde(default)]
    pub case_id: String,
    /// Human-readable description
    #[serde(default)]
    pub title: String,
    /// The request to send
    pub api: RequestTemplate,
    /// Variables to pull out of the response (name -> path query)
    #[serde(default)]
    pub extract: ExtractRules,
    /// Expected status and body values
    pub expected: Expectation,
}

/// Request template; leaves of `params`, `json` and `data` may be `${name}` references
#[derive(Deserialize, Debug, Clone)]
pub struct RequestTemplate {
    /// HTTP method (default: get)
    #[serde(default = "default_method")]
    pub method: String,
    /// Path appended to the environment's base URL
    pub path: Option<String>,
    /// Request headers
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// URL query parameters
    #[serde(default)]
    pub params: TemplateMap,
    /// JSON body; sent whenever the template declares it
    pub json: Option<TemplateMap>,
    /// Form body
    #[serde(default)]
    pub data: TemplateMap,
}

fn default_method() -> String {
    "get".to_string()
}

/// Expected response
#[derive(Deserialize, Debug, Clone)]
pub struct Expectation {
    /// Expected HTTP status code
    pub code: u16,
    /// Body path (e.g. `data.status`) -> expected value
    #[serde(default)]
    pub json: TemplateMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateLeaf;
    use serde_json::json;

    #[test]
    fn test_full_case() {
        let case: TestCase = serde_yaml::from_str(
            r#"
case_id: order_001
title: Create an order
api:
  method: post
  path: /api/order/create
  headers:
    X-Trace: "1"
  json:
    user_id: ${user_id}
    amount: 100
extract:
  order_id: $.data.orderId
expected:
  code: 200
  json:
    code: "0000"
    data.userId: ${user_id}
"#,
        )
        .unwrap();

        assert_eq!(case.case_id, "order_001");
        assert_eq!(case.api.method, "post");
        assert_eq!(case.api.path.as_deref(), Some("/api/order/create"));
        assert_eq!(case.api.headers["X-Trace"], json!("1"));

        let body = case.api.json.as_ref().unwrap();
        let leaves: Vec<(&str, &TemplateLeaf)> = body.iter().collect();
        assert_eq!(leaves[0], ("user_id", &TemplateLeaf::Reference("user_id".into())));
        assert_eq!(leaves[1], ("amount", &TemplateLeaf::Literal(json!(100))));

        assert_eq!(case.extract.len(), 1);
        assert_eq!(case.expected.code, 200);
        assert_eq!(case.expected.json.len(), 2);
    }

    #[test]
    fn test_minimal_case_defaults() {
        let case: TestCase = serde_yaml::from_str(
            r#"
api:
  path: /ping
expected:
  code: 204
"#,
        )
        .unwrap();

        assert!(case.case_id.is_empty());
        assert_eq!(case.api.method, "get");
        assert!(case.api.json.is_none());
        assert!(case.api.params.is_empty());
        assert!(case.extract.is_empty());
        assert!(case.expected.json.is_empty());
    }

    #[test]
    fn test_missing_expected_rejected() {
        let result: Result<TestCase, _> = serde_yaml::from_str("api:\n  path: /x\n");
        assert!(result.is_err());
    }
}
