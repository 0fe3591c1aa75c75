//! Document download client with hard size limits.

mod response;

pub use response::HeadResponse;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::DocumentConfig;

/// Download failures.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Request(e.to_string()),
        }
    }
}

/// Time-bounded document transport.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Headers only; redirects are followed.
    async fn head(&self, url: &str) -> Result<HeadResponse, FetchError>;

    /// Body bytes, failing once more than `max_bytes` have arrived.
    async fn get(&self, url: &str, max_bytes: u64) -> Result<Vec<u8>, FetchError>;
}

/// reqwest-based [`DocumentFetcher`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &DocumentConfig) -> Result<Self, FetchError> {
        Self::new(&config.user_agent, Duration::from_secs(config.timeout))
    }
}

#[async_trait]
impl DocumentFetcher for HttpClient {
    async fn head(&self, url: &str) -> Result<HeadResponse, FetchError> {
        let response = self.client.head(url).send().await?;
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_lowercase(), v.to_string()))
            })
            .collect();

        Ok(HeadResponse {
            status: response.status().as_u16(),
            headers,
        })
    }

    async fn get(&self, url: &str, max_bytes: u64) -> Result<Vec<u8>, FetchError> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;

        if let Some(len) = response.content_length() {
            if len > max_bytes {
                return Err(FetchError::TooLarge { limit: max_bytes });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > max_bytes {
                return Err(FetchError::TooLarge { limit: max_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
