pub mod etherscan;
pub mod nanopool;

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("upstream reported an error: {0}")]
    Upstream(String),
}

/// Blocking GET returning the response body. Split out so clients can be
/// exercised against canned bodies.
pub trait HttpGet: Send + Sync {
    fn get(&self, url: &str) -> Result<String, ApiError>;
}

pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport { url: String::new(), reason: e.to_string() })?;
        Ok(Self { inner })
    }
}

impl HttpGet for HttpClient {
    fn get(&self, url: &str) -> Result<String, ApiError> {
        debug!(%url, "GET");
        let transport = |e: reqwest::Error| ApiError::Transport { url: url.to_string(), reason: e.to_string() };
        let resp = self.inner.get(url).send().map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status { url: url.to_string(), status: status.as_u16() });
        }
        resp.text().map_err(transport)
    }
}

pub(crate) fn get_body<C: HttpGet + ?Sized>(client: &C, url: &str) -> Result<String, ApiError> {
    client.get(url).map_err(|e| {
        error!(%url, error = %e, "request failed");
        e
    })
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| {
        error!(%url, error = %source, "decode failed");
        ApiError::Decode { url: url.to_string(), source }
    })
}
