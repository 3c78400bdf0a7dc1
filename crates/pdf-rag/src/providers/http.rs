//! Shared HTTP client with timeout and retry for the remote providers

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Longest response body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Failure of a single JSON request
#[derive(Debug, thiserror::Error)]
pub enum HttpFailure {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse response: {0}")]
    Decode(String),
}

impl HttpFailure {
    /// Transport errors, rate limiting and server errors are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Decode(_) => false,
        }
    }
}

/// HTTP client with exponential-backoff retry
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpClient {
    /// Create a new client from HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Send a request built by `build` and decode the JSON response
    ///
    /// `build` is called once per attempt, since a `RequestBuilder` is consumed
    /// by sending it.
    pub async fn send_json<T, F>(&self, build: F) -> std::result::Result<T, HttpFailure>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0u32;

        loop {
            match self.send_once(&build).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.base_delay * 2u32.pow(attempt);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<T, F>(&self, build: &F) -> std::result::Result<T, HttpFailure>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = build(&self.client)
            .send()
            .await
            .map_err(HttpFailure::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpFailure::Status {
                status,
                body: truncate_body(body),
            });
        }

        let bytes = response.bytes().await.map_err(HttpFailure::Transport)?;
        serde_json::from_slice(&bytes).map_err(|e| HttpFailure::Decode(e.to_string()))
    }
}

fn truncate_body(body: String) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        return body;
    }
    let truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
    format!("{}...", truncated)
}
