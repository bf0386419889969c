//! Request dispatch
//!
//! The executor talks to the backend through the [`Dispatcher`] trait so the
//! transport can be swapped out (the CLI uses [`HttpDispatcher`]).

mod client;

pub use client::HttpDispatcher;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::common::{Error, Result};

/// A fully resolved request, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    /// Upper-case HTTP method
    pub method: String,
    /// Path appended to the base URL
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub params: Map<String, Value>,
    /// JSON body, sent when present
    pub json: Option<Map<String, Value>>,
    /// Form body, sent when non-empty
    pub form: Map<String, Value>,
}

impl PreparedRequest {
    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing value with the same name
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}

/// A received response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            let preview: String = self.body.chars().take(120).collect();
            Error::ResponseNotJson(format!("{} (body: {:?})", e, preview))
        })
    }
}

/// Issues requests against the backend
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: &PreparedRequest) -> Result<HttpResponse>;
}

/// Flatten a parameter value into the strings sent on the wire
///
/// Null is dropped, arrays repeat the key, objects are sent as JSON text.
pub fn param_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(param_values).collect(),
        other => vec![other.to_string()],
    }
}

/// Flatten a parameter map into ordered key/value pairs
pub fn param_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .flat_map(|(key, value)| {
            param_values(value)
                .into_iter()
                .map(move |v| (key.clone(), v))
        })
        .collect()
}
