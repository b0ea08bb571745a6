//! Fetch-once downloader.
//!
//! A download is written into a [`DocumentCache`] and then validated. If the
//! file cannot be parsed it is removed again, so the next call for the same
//! key fetches it afresh.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};
use votelens_store::{DocumentCache, StoreError};

use crate::FetchError;

const USER_AGENT: &str = concat!("votelens/", env!("CARGO_PKG_VERSION"));

/// Checks that a freshly downloaded file is parseable.
pub type Validator = Arc<dyn Fn(&Path) -> Result<(), StoreError> + Send + Sync>;

/// HTTP client that fills a document cache.
pub struct Downloader {
    client: reqwest::Client,
    delay: Duration,
}

impl Downloader {
    /// Create a downloader with a per-request `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            delay: Duration::from_millis(500),
        })
    }

    /// Pause after each network download. Defaults to 500ms.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// GET `url` and return the body.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        info!(url = %url, "downloading");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Server {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = resp.bytes().await?;
        debug!(url = %url, bytes = bytes.len(), "download complete");
        Ok(bytes.to_vec())
    }

    /// Make sure `key` is present in `cache`, downloading it from `url` if not.
    ///
    /// Cached entries are returned without touching the network. A download
    /// that fails `validate` is evicted and reported as [`FetchError::Invalid`].
    pub async fn ensure_fetched(
        &self,
        url: &str,
        key: &str,
        cache: &dyn DocumentCache,
        validate: Validator,
    ) -> Result<PathBuf, FetchError> {
        if let Some(path) = cache.get(key) {
            debug!(key, "cache hit");
            return Ok(path);
        }

        let bytes = self.fetch(url).await?;
        let path = cache.put(key, &bytes)?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let check = path.clone();
        let verdict = tokio::task::spawn_blocking(move || validate(&check)).await?;
        if let Err(source) = verdict {
            error!(url = %url, key, error = %source, "downloaded file is invalid, deleting");
            cache.invalidate(key)?;
            return Err(FetchError::Invalid {
                url: url.to_string(),
                source,
            });
        }
        Ok(path)
    }
}
