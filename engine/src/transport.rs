//! Backend transport.
//!
//! Components never talk HTTP directly: a sync cycle asks a [`Transport`] for
//! the body at a request path. [`HttpTransport`] is the production
//! implementation on `reqwest`; tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while fetching a response.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The backend answered with a non-2xx status.
    #[error("backend answered {status} for {path}")]
    Status { status: u16, path: String },

    /// The request failed before a status was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport-specific failure without an HTTP cause.
    #[error("request failed: {0}")]
    Request(String),
}

/// Fetches response bodies for request paths like `webui/table?action=sync`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET for `path` and returns the body text of a 2xx response.
    async fn get(&self, path: &str) -> Result<String, TransportError>;
}

/// HTTP transport rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for `base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base URL requests are joined to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<String, TransportError> {
        let url = self.url_for(path);
        debug!(url = %url, "Requesting component state");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
