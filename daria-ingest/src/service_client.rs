//! HTTP client for the semantic analysis service
//!
//! Thin wrapper over `reqwest` that builds endpoint URLs from the configured
//! base URL, applies the request timeout and rate limit, and reduces
//! responses to status plus body text.

use std::sync::Arc;

use daria_common::config::ServiceConfig;
use daria_common::{Error, Result};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

use crate::rate_limiter::RateLimiter;

const USER_AGENT: &str = concat!("daria-ingest/", env!("CARGO_PKG_VERSION"));

/// Placeholder replaced by the session id in endpoint templates
pub const ID_PLACEHOLDER: &str = "{id}";

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared client for all calls to the analysis service
#[derive(Clone)]
pub struct ServiceClient {
    http_client: reqwest::Client,
    base_url: Url,
    config: Arc<ServiceConfig>,
    rate_limiter: Arc<RateLimiter>,
}

impl ServiceClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL {:?}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Base URL {:?} cannot carry a path",
                config.base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            rate_limiter: Arc::new(RateLimiter::new(config.request_interval)),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Resolve a path template against the base URL
    ///
    /// Each `/`-separated segment is appended to the base path; `{id}` is
    /// replaced by `session_id` and percent-encoded as part of its segment.
    pub fn endpoint_url(&self, template: &str, session_id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for segment in template.split('/').filter(|s| !s.is_empty()) {
                match session_id {
                    Some(id) if segment.contains(ID_PLACEHOLDER) => {
                        segments.push(&segment.replace(ID_PLACEHOLDER, id));
                    }
                    _ => {
                        segments.push(segment);
                    }
                }
            }
        }
        url
    }

    /// POST a JSON body (or nothing) and collect status and body text
    pub async fn post<T: Serialize + ?Sized>(&self, url: Url, body: Option<&T>) -> Result<HttpReply> {
        self.rate_limiter.wait().await;

        tracing::debug!(url = %url, "POST");
        let mut request = self.http_client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(describe_transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(HttpReply { status, body })
    }

    /// `GET {base}/api/sessions`
    ///
    /// Any failure here means the run cannot start.
    pub async fn list_sessions(&self) -> Result<Vec<Value>> {
        self.rate_limiter.wait().await;

        let url = self.endpoint_url(&self.config.sessions_path, None);
        tracing::debug!(url = %url, "GET");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Startup(format!("Session listing failed: {}", describe_transport_error(e))))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Startup(format!(
                "Session listing at {} returned {}: {}",
                url,
                status.as_u16(),
                body.trim()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| Error::Startup(format!("Session listing is not valid JSON: {}", e)))?;

        match value {
            Value::Array(items) => Ok(items),
            _ => Err(Error::Startup(
                "Session listing did not return a JSON array".to_string(),
            )),
        }
    }
}

fn describe_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Http(format!("request timed out: {}", e))
    } else {
        Error::Http(e.to_string())
    }
}
