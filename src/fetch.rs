use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TileFetchError;
use crate::grid::TileRequest;
use crate::model::TiledLayer;

/// Retry/backoff/concurrency policy for one layer's tile fetches.
#[derive(Clone, Debug)]
pub struct FetchPolicy {
    /// Total attempts per tile, including the first.
    pub attempts: u32,
    /// Delay before the second attempt; doubles after every failure.
    pub initial_backoff: Duration,
    /// Budget per attempt, not per tile.
    pub timeout: Duration,
    /// Upper bound on in-flight fetches within one layer.
    pub concurrency: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(250),
            timeout: Duration::from_secs(10),
            concurrency: 8,
        }
    }
}

/// Where tile bytes come from. The pipeline only ever sees this seam, which
/// is what lets tests swap in in-memory sources.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, TileFetchError>;
}

/// Substitute a tile request into the layer's locator template:
/// `{baseURL}/{z}/{x}/{y}.{extension}`.
pub fn tile_locator(layer: &TiledLayer, request: &TileRequest) -> String {
    format!(
        "{}/{}/{}/{}.{}",
        layer.base_url.trim_end_matches('/'),
        request.level,
        request.col,
        request.row,
        layer.extension,
    )
}

/// HTTP(S) tile source backed by a shared reqwest client.
pub struct HttpTileSource {
    client: reqwest::Client,
}

impl HttpTileSource {
    pub fn new(attempt_timeout: Duration) -> Result<Self, TileFetchError> {
        let client = reqwest::Client::builder()
            .timeout(attempt_timeout)
            .build()
            .map_err(|e| TileFetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, TileFetchError> {
        let response = self.client.get(locator).send().await.map_err(|e| {
            if e.is_timeout() {
                TileFetchError::Timeout
            } else {
                TileFetchError::Transport(e.to_string())
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TileFetchError::Status(status.as_u16()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TileFetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Filesystem tile source: locators resolve relative to a root directory
/// laid out `{z}/{x}/{y}.{ext}`, for pre-seeded or cached tile trees.
pub struct FileTileSource {
    root: PathBuf,
}

impl FileTileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TileSource for FileTileSource {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, TileFetchError> {
        let path = self.root.join(locator.trim_start_matches('/'));
        Ok(tokio::fs::read(path).await?)
    }
}

/// Fetch one tile with retries and exponential backoff. Every failed attempt
/// is logged at debug; the caller decides what exhaustion means (the
/// pipeline substitutes a transparent placeholder).
pub async fn fetch_with_retry(
    source: &dyn TileSource,
    locator: &str,
    policy: &FetchPolicy,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, TileFetchError> {
    let attempts = policy.attempts.max(1);
    let mut backoff = policy.initial_backoff;

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(TileFetchError::Cancelled);
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(TileFetchError::Cancelled),
            fetched = tokio::time::timeout(policy.timeout, source.fetch(locator)) => {
                fetched.unwrap_or(Err(TileFetchError::Timeout))
            }
        };

        match outcome {
            Ok(bytes) => return Ok(bytes),
            Err(TileFetchError::Cancelled) => return Err(TileFetchError::Cancelled),
            Err(err) => {
                tracing::debug!(%locator, attempt, %err, "tile fetch attempt failed");
                if attempt == attempts {
                    return Err(err);
                }
                tokio::select! {
                    _ = cancel.cancelled() => return Err(TileFetchError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = backoff.saturating_mul(2);
            }
        }
    }
    unreachable!("loop returns on the final attempt")
}
