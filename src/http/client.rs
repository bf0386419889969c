//! reqwest-backed dispatcher

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, error, info};

use super::{param_pairs, Dispatcher, HttpResponse, PreparedRequest};
use crate::common::config::EnvironmentConfig;
use crate::common::{Error, Result};

/// Sends requests to one base URL with a fixed per-request timeout
///
/// A single client is shared for the whole run so connections are reused.
pub struct HttpDispatcher {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpDispatcher {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!("Dispatcher ready, base URL: {}", base_url);

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            timeout_secs,
        })
    }

    pub fn from_environment(env: &EnvironmentConfig) -> Result<Self> {
        Self::new(&env.base_url, env.timeout_secs)
    }

    /// Join the base URL and a request path without doubling the slash
    pub fn url_for(&self, path: &str) -> String {
        match (self.base_url.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{}{}", self.base_url, &path[1..]),
            (false, false) if !path.is_empty() => format!("{}/{}", self.base_url, path),
            _ => format!("{}{}", self.base_url, path),
        }
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, request: &PreparedRequest) -> Result<HttpResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidMethod(request.method.clone()))?;
        let url = self.url_for(&request.path);

        info!("Request: {} {}", method, url);
        debug!(
            "Request payload: params={:?}, json={:?}, form={:?}",
            request.params, request.json, request.form
        );

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.params.is_empty() {
            builder = builder.query(&param_pairs(&request.params));
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }
        if !request.form.is_empty() {
            builder = builder.form(&param_pairs(&request.form));
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            error!("Request failed: {}", e);
            if e.is_timeout() {
                Error::Timeout(self.timeout_secs)
            } else {
                Error::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.timeout_secs)
            } else {
                Error::Transport(e.to_string())
            }
        })?;

        let elapsed = started.elapsed();
        info!("Response: status {} in {}ms", status, elapsed.as_millis());
        debug!("Response body: {}", body);

        Ok(HttpResponse {
            status,
            body,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let d = HttpDispatcher::new("https://api.example.test", 5).unwrap();
        assert_eq!(d.url_for("/api/login"), "https://api.example.test/api/login");
        assert_eq!(d.url_for("api/login"), "https://api.example.test/api/login");

        let d = HttpDispatcher::new("https://api.example.test/", 5).unwrap();
        assert_eq!(d.url_for("/api/login"), "https://api.example.test/api/login");
        assert_eq!(d.url_for("api/login"), "https://api.example.test/api/login");
    }

    #[tokio::test]
    async fn test_invalid_method() {
        let d = HttpDispatcher::new("http://127.0.0.1:9", 1).unwrap();
        let request = PreparedRequest {
            method: "NOT A METHOD".into(),
            path: "/".into(),
            headers: Vec::new(),
            params: Default::default(),
            json: None,
            form: Default::default(),
        };
        assert!(matches!(
            d.dispatch(&request).await,
            Err(Error::InvalidMethod(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Port 9 (discard) is not listening on loopback in test environments
        let d = HttpDispatcher::new("http://127.0.0.1:9", 2).unwrap();
        let request = PreparedRequest {
            method: "GET".into(),
            path: "/".into(),
            headers: Vec::new(),
            params: Default::default(),
            json: None,
            form: Default::default(),
        };
        let err = d.dispatch(&request).await.unwrap_err();
        assert_eq!(err.kind(), crate::common::FailureKind::Transport);
    }
}
