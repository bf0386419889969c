//! Response assertions
//!
//! Standard assertion semantics: the first failing check aborts the case.

use serde_json::Value;
use tracing::info;

use crate::common::{Error, Result};
use crate::jsonpath::{loose_eq, PathQuery};

/// Assert the response status code
pub fn assert_status(actual: u16, expected: u16) -> Result<()> {
    if actual != expected {
        return Err(Error::StatusMismatch { expected, actual });
    }
    info!("Status assertion passed: {}", actual);
    Ok(())
}

/// Query for an expectation key: `data.status` becomes `$.data.status`,
/// keys already starting with `$` are used as written
pub fn body_query(key: &str) -> String {
    if key.starts_with('$') {
        key.to_string()
    } else {
        format!("$.{}", key)
    }
}

/// Assert that the first match of `key` in `body` equals `expected`
pub fn assert_json(body: &Value, key: &str, expected: &Value) -> Result<()> {
    let query = PathQuery::parse(&body_query(key))?;
    let actual = query
        .first(body)
        .ok_or_else(|| Error::NoMatch(query.to_string()))?;

    if !loose_eq(actual, expected) {
        return Err(Error::value_mismatch(query.as_str(), expected, actual));
    }
    info!("JSON assertion passed: {} = {}", query, expected);
    Ok(())
}
