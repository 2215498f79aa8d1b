//! HTTP fetch helper with exponential back-off.

use crate::errors::SourceError;
use std::time::Duration;
use tracing::{error, info};

/// Maximum number of attempts before a url is given up on.
pub const BACKOFF_MAX_RETRIES: u32 = 10;

const USER_AGENT: &str = concat!("trustless-gateway/", env!("CARGO_PKG_VERSION"));

/// A thin wrapper around [reqwest::Client] that retries with exponential
/// back-off (2^n seconds per failed attempt).
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_retries: u32,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    /// Creates a fetcher with the default retry budget.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client, max_retries: BACKOFF_MAX_RETRIES }
    }

    /// Overrides the retry budget.
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Performs a single GET, requiring a 2xx response.
    pub async fn get(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { status: status.as_u16(), url: url.to_string() });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// GETs a url, retrying with exponential back-off until the retry budget
    /// is exhausted.
    pub async fn get_with_backoff(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let mut last_err = SourceError::UpstreamUnavailable { context: url.to_string() };
        for attempt in 0..self.max_retries {
            match self.get(url).await {
                Ok(data) => {
                    if attempt > 0 {
                        info!(target: "fetch", "successfully fetched data from url {url}");
                    }
                    return Ok(data);
                }
                Err(err) => {
                    let delay = 2u64.pow(attempt);
                    error!(target: "fetch", "failed to fetch from url {url}, retrying in {delay} seconds");
                    last_err = err;
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
            }
        }
        error!(
            target: "fetch",
            "failed to fetch data from url within maximum retry limit of {}", self.max_retries
        );
        Err(last_err)
    }
}
