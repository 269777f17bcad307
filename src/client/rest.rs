//! REST client for the depth snapshot.
//!
//! The live synchronization protocol needs exactly one HTTP call: a
//! full depth snapshot (`GET /api/v3/depth`) to anchor the buffered
//! delta stream. The endpoint is public, so no signing or headers beyond
//! the defaults are involved.

use std::future::Future;

use url::Url;

use crate::config::Config;
use crate::error::Error;
use crate::types::DepthSnapshot;

/// Capability to fetch one depth snapshot.
///
/// The live loop depends on this seam instead of a concrete HTTP client
/// so the synchronization path is testable without a network.
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch a full depth snapshot.
    fn fetch(&self) -> impl Future<Output = Result<DepthSnapshot, Error>> + Send;
}

/// HTTP client for the depth snapshot endpoint
#[derive(Debug)]
pub struct SnapshotClient {
    client: reqwest::Client,
    url: Url,
}

impl SnapshotClient {
    /// Create a snapshot client from the feed configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot URL is invalid or the HTTP
    /// client cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let url = Url::parse(&config.snapshot_url())
            .map_err(|e| Error::Config(format!("invalid snapshot URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(config.snapshot_timeout())
            .build()?;

        Ok(Self { client, url })
    }

    /// Fetch a full depth snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on connection, status, or body-decoding
    /// failures.
    pub async fn fetch_snapshot(&self) -> Result<DepthSnapshot, Error> {
        tracing::info!(url = %self.url, "fetching depth snapshot");

        let snapshot: DepthSnapshot = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::info!(
            last_update_id = snapshot.last_update_id,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "depth snapshot received"
        );
        Ok(snapshot)
    }
}

impl SnapshotFetcher for SnapshotClient {
    fn fetch(&self) -> impl Future<Output = Result<DepthSnapshot, Error>> + Send {
        self.fetch_snapshot()
    }
}
