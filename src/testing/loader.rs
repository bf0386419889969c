//! Case file loading
//!
//! A case file is either one YAML document holding a sequence of case
//! records, or a stream of documents with one record each.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::assertions::body_query;
use super::config::TestCase;
use crate::common::{Error, Result};
use crate::jsonpath::PathQuery;

/// Read every case from `path`, filling in missing ids as `<prefix>_case_<index>`
pub fn load_cases(path: &Path, id_prefix: &str) -> Result<Vec<TestCase>> {
    if !path.exists() {
        return Err(Error::CaseFileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    parse_cases(&content, id_prefix).map_err(|e| match e {
        Error::Yaml(inner) => Error::case_file_parse(path, inner),
        Error::Config(message) => Error::case_file_parse(path, message),
        other => other,
    })
}

/// Parse case records from YAML text
pub fn parse_cases(content: &str, id_prefix: &str) -> Result<Vec<TestCase>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }

    let records = if documents.len() == 1 && documents[0].is_array() {
        match documents.pop() {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    } else {
        documents
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let mut case: TestCase = serde_json::from_value(record)
                .map_err(|e| Error::Config(format!("case #{}: {}", index + 1, e)))?;
            if case.case_id.is_empty() {
                case.case_id = format!("{}_case_{}", id_prefix, index);
            }
            Ok(case)
        })
        .collect()
}

/// Problems that would stop `case` from running, without sending anything
pub fn case_problems(case: &TestCase) -> Vec<String> {
    let mut problems = Vec::new();

    if case.api.path.as_deref().map_or(true, str::is_empty) {
        problems.push(Error::MissingRequestPath.to_string());
    }
    if reqwest::Method::from_bytes(case.api.method.to_uppercase().as_bytes()).is_err() {
        problems.push(Error::InvalidMethod(case.api.method.clone()).to_string());
    }
    for (name, query) in case.extract.iter() {
        if let Err(e) = PathQuery::parse(query) {
            problems.push(format!("extract '{}': {}", name, e));
        }
    }
    for (key, _) in case.expected.json.iter() {
        if let Err(e) = PathQuery::parse(&body_query(key)) {
            problems.push(format!("expected '{}': {}", key, e));
        }
    }

    problems
}
