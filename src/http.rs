// src/http.rs
//! Outbound HTTP for the feed adapters.
//!
//! Adapters talk to a [`Transport`] so tests can script responses without a
//! network. [`HttpTransport`] is the reqwest-backed implementation used by the
//! binary.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::retry::Retryable;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid payload: {0}")]
    Validation(String),
}

impl FetchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Timeouts, connection errors, 408, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => {
                matches!(*status, 408 | 429) || (500..=599).contains(status)
            }
            FetchError::Validation(_) => false,
        }
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with `query`, require 2xx and a JSON body.
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, FetchError>;

    /// GET `url`, require 2xx, return the body as text.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("morning-digest/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }

    async fn get_body(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let rsp = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        rsp.text().await.map_err(transport)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        let body = self.get_body(url, query).await?;
        serde_json::from_str(&body)
            .map_err(|e| FetchError::validation(format!("{url}: malformed json: {e}")))
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get_body(url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        let st = |status| FetchError::Status {
            url: "u".into(),
            status,
        };
        assert!(st(503).is_transient());
        assert!(st(429).is_transient());
        assert!(st(408).is_transient());
        assert!(!st(404).is_transient());
        assert!(!st(401).is_transient());
        assert!(!FetchError::validation("missing field").is_transient());
    }
}
