// src/fetch/mod.rs

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::Client;
use tokio::{fs, time::sleep};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::error::{FeedError, Result};

/// Where the raw snapshot comes from.
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Longest single wait between retries.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Plain HTTP(S) GET with exponential-backoff retries.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl HttpFeedSource {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| FeedError::Config(format!("building HTTP client: {}", e)))?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: Client, cfg: &FetchConfig) -> Self {
        Self {
            client,
            max_retries: cfg.max_retries,
            initial_backoff_ms: cfg.initial_backoff_ms,
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling up to [`MAX_BACKOFF_MS`].
    fn backoff_ms(&self, attempt: u32) -> u64 {
        self.initial_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            .min(MAX_BACKOFF_MS)
    }

    async fn get_bytes_core(&self, url: &Url) -> std::result::Result<Vec<u8>, reqwest::Error> {
        debug!("Fetching {}", url);
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}

impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let mut attempts = 0;
        loop {
            match self.get_bytes_core(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = self.backoff_ms(attempts);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    error!(%url, error = %e, "Exhausted retries");
                    return Err(FeedError::Fetch {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }
        }
    }
}

/// A snapshot already on disk. The URL is only logged.
#[derive(Debug, Clone)]
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedSource for FileFeedSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        info!(%url, path = %self.path.display(), "reading local snapshot instead of fetching");
        fs::read(&self.path)
            .await
            .map_err(|e| FeedError::io(&self.path, e))
    }
}
