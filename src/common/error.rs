//! Error types for the API test harness
//!
//! Every error maps onto one [`FailureKind`] so the runner can decide whether
//! a case failed an assertion, errored, or has to abort its whole group.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Variable Store Errors ===
    #[error("Variable store not found: {path}")]
    StoreNotFound { path: String },

    #[error("Invalid variable store '{path}': {message}")]
    StoreParse { path: String, message: String },

    #[error("Invalid variable path '{0}'")]
    InvalidPath(String),

    // === Template / Precondition Errors ===
    #[error("Variable '{0}' is not set")]
    MissingVariable(String),

    #[error("Precondition failed: '{name}' is not set. {hint}")]
    MissingPrecondition { name: String, hint: String },

    // === Query Errors ===
    #[error("Invalid path query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    // === Request Errors ===
    #[error("Request template is missing the mandatory 'path' field")]
    MissingRequestPath,

    #[error("Unsupported HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Response is not valid JSON: {0}")]
    ResponseNotJson(String),

    // === Assertion Errors ===
    #[error("Status code assertion failed: expected {expected}, actual {actual}")]
    StatusMismatch { expected: u16, actual: u16 },

    #[error("JSON assertion failed at '{path}': expected {expected}, actual {actual}")]
    ValueMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("JSON assertion failed: no match for '{0}'")]
    NoMatch(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Case file not found: {0}")]
    CaseFileNotFound(String),

    #[error("Invalid case file '{path}': {message}")]
    CaseFileParse { path: String, message: String },

    // === Run Control ===
    #[error("Run interrupted")]
    Interrupted,

    #[error("{failed} of {total} cases did not pass")]
    RunFailed { failed: usize, total: usize },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure category reported for a case or group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Missing mandatory data: request path, backing file, precondition variable
    Configuration,
    /// Actual vs expected mismatch
    Assertion,
    /// Transport error, timeout or unparseable response
    Transport,
    /// The run was stopped before the case completed
    Interrupted,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Configuration => "configuration",
            FailureKind::Assertion => "assertion",
            FailureKind::Transport => "transport",
            FailureKind::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Category of this error for reporting
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::StatusMismatch { .. }
            | Error::ValueMismatch { .. }
            | Error::NoMatch(_)
            | Error::RunFailed { .. } => FailureKind::Assertion,
            Error::Transport(_) | Error::Timeout(_) | Error::ResponseNotJson(_) => {
                FailureKind::Transport
            }
            Error::Interrupted => FailureKind::Interrupted,
            Error::StoreNotFound { .. }
            | Error::StoreParse { .. }
            | Error::InvalidPath(_)
            | Error::MissingVariable(_)
            | Error::MissingPrecondition { .. }
            | Error::InvalidQuery { .. }
            | Error::MissingRequestPath
            | Error::InvalidMethod(_)
            | Error::Config(_)
            | Error::ConfigParse(_)
            | Error::CaseFileNotFound(_)
            | Error::CaseFileParse { .. }
            | Error::Io(_)
            | Error::FileRead { .. }
            | Error::Json(_)
            | Error::Yaml(_) => FailureKind::Configuration,
        }
    }

    /// Create a store not found error for a backing file
    pub fn store_not_found(path: &Path) -> Self {
        Self::StoreNotFound {
            path: path.display().to_string(),
        }
    }

    /// Create a store parse error for a backing file
    pub fn store_parse(path: &Path, message: impl ToString) -> Self {
        Self::StoreParse {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create an invalid query error
    pub fn invalid_query(query: &str, reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            query: query.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a missing precondition error with a hint on how to fix it
    pub fn missing_precondition(name: &str, hint: &str) -> Self {
        Self::MissingPrecondition {
            name: name.to_string(),
            hint: hint.to_string(),
        }
    }

    /// Create a value mismatch error, rendering both values as JSON
    pub fn value_mismatch(
        path: &str,
        expected: &serde_json::Value,
        actual: &serde_json::Value,
    ) -> Self {
        Self::ValueMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a case file parse error
    pub fn case_file_parse(path: &Path, message: impl ToString) -> Self {
        Self::CaseFileParse {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assertion_errors_are_assertion_kind() {
        let err = Error::StatusMismatch {
            expected: 200,
            actual: 500,
        };
        assert_eq!(err.kind(), FailureKind::Assertion);
        assert_eq!(Error::NoMatch("$.x".into()).kind(), FailureKind::Assertion);
    }

    #[test]
    fn test_transport_errors_are_transport_kind() {
        assert_eq!(Error::Timeout(10).kind(), FailureKind::Transport);
        assert_eq!(
            Error::ResponseNotJson("<html>".into()).kind(),
            FailureKind::Transport
        );
    }

    #[test]
    fn test_precondition_is_configuration_kind() {
        let err = Error::missing_precondition("global.token", "Run the login group first");
        assert_eq!(err.kind(), FailureKind::Configuration);
        assert!(err.to_string().contains("global.token"));
    }

    #[test]
    fn test_value_mismatch_message_names_path_expected_actual() {
        let err = Error::value_mismatch("$.data.status", &json!("PAID"), &json!("PENDING"));
        let msg = err.to_string();
        assert!(msg.contains("$.data.status"));
        assert!(msg.contains("\"PAID\""));
        assert!(msg.contains("\"PENDING\""));
    }

    #[test]
    fn test_run_failed_is_not_a_configuration_error() {
        let err = Error::RunFailed {
            failed: 1,
            total: 3,
        };
        assert_eq!(err.kind(), FailureKind::Assertion);
        assert_eq!(err.to_string(), "1 of 3 cases did not pass");
    }
}
