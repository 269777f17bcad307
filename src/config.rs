//! Configuration for the depth feed.
//!
//! This module provides the [`Config`] struct selecting the feed path
//! (live stream vs. recorded capture) and carrying endpoint and timeout
//! settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which input drives the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Live WebSocket stream, resynchronized against a REST snapshot
    Live,
    /// Recorded capture replayed from a file
    Replay,
}

const DEFAULT_SYMBOL: &str = "BTCUSDT";
const DEFAULT_SNAPSHOT_DEPTH: u32 = 1000;

/// Configuration for a feed session
///
/// # Example
///
/// ```rust
/// use bookfeed::Config;
/// use std::time::Duration;
///
/// // Live stream with defaults (BTCUSDT on Binance)
/// let live = Config::live();
///
/// // Another symbol, tighter snapshot timeout
/// let config = Config::live()
///     .with_symbol("ETHUSDT")
///     .with_snapshot_timeout(Duration::from_secs(5));
///
/// // Offline capture
/// let replay = Config::replay("captures/btcusdt.ndjson.gz");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    mode: FeedMode,

    /// Trading symbol, uppercase (used in both endpoint URLs)
    symbol: String,

    /// Capture path (replay mode only)
    source: Option<PathBuf>,

    /// Full WebSocket URL override
    stream_url: Option<String>,

    /// Full snapshot URL override
    snapshot_url: Option<String>,

    /// Levels requested from the snapshot endpoint
    snapshot_depth: u32,

    /// Upper bound on the background snapshot fetch
    snapshot_timeout: Duration,
}

impl Config {
    /// Configuration for a live session with default Binance endpoints.
    #[must_use]
    pub fn live() -> Self {
        Self {
            mode: FeedMode::Live,
            symbol: DEFAULT_SYMBOL.to_string(),
            source: None,
            stream_url: None,
            snapshot_url: None,
            snapshot_depth: DEFAULT_SNAPSHOT_DEPTH,
            snapshot_timeout: Duration::from_secs(10),
        }
    }

    /// Configuration replaying the given recorded capture.
    #[must_use]
    pub fn replay(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: FeedMode::Replay,
            source: Some(path.into()),
            ..Self::live()
        }
    }

    /// Set the trading symbol (stored uppercase).
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into().to_uppercase();
        self
    }

    /// Override the WebSocket stream URL (used verbatim).
    #[must_use]
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    /// Override the snapshot URL (used verbatim, query string included).
    #[must_use]
    pub fn with_snapshot_url(mut self, url: impl Into<String>) -> Self {
        self.snapshot_url = Some(url.into());
        self
    }

    /// Set the number of levels requested from the snapshot endpoint.
    #[must_use]
    pub fn with_snapshot_depth(mut self, depth: u32) -> Self {
        self.snapshot_depth = depth;
        self
    }

    /// Set the snapshot fetch timeout.
    #[must_use]
    pub fn with_snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout = timeout;
        self
    }

    /// Get the feed mode.
    #[must_use]
    pub const fn mode(&self) -> FeedMode {
        self.mode
    }

    /// Get the trading symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the capture path (replay mode).
    #[must_use]
    pub fn replay_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Get the WebSocket URL for the incremental depth stream.
    #[must_use]
    pub fn stream_url(&self) -> String {
        self.stream_url.clone().unwrap_or_else(|| {
            format!(
                "wss://stream.binance.com:9443/ws/{}@depth@100ms",
                self.symbol.to_lowercase()
            )
        })
    }

    /// Get the REST URL for the depth snapshot.
    #[must_use]
    pub fn snapshot_url(&self) -> String {
        self.snapshot_url.clone().unwrap_or_else(|| {
            format!(
                "https://api.binance.com/api/v3/depth?symbol={}&limit={}",
                self.symbol, self.snapshot_depth
            )
        })
    }

    /// Get the snapshot fetch timeout.
    #[must_use]
    pub const fn snapshot_timeout(&self) -> Duration {
        self.snapshot_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_defaults() {
        let config = Config::live();
        assert_eq!(config.mode(), FeedMode::Live);
        assert_eq!(config.symbol(), "BTCUSDT");
        assert_eq!(config.snapshot_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.stream_url(),
            "wss://stream.binance.com:9443/ws/btcusdt@depth@100ms"
        );
        assert_eq!(
            config.snapshot_url(),
            "https://api.binance.com/api/v3/depth?symbol=BTCUSDT&limit=1000"
        );
    }

    #[test]
    fn test_replay_config() {
        let config = Config::replay("/tmp/capture.gz");
        assert_eq!(config.mode(), FeedMode::Replay);
        assert_eq!(config.replay_path(), Some(Path::new("/tmp/capture.gz")));
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::live()
            .with_symbol("ethusdt")
            .with_snapshot_depth(500)
            .with_snapshot_timeout(Duration::from_secs(3));

        assert_eq!(config.symbol(), "ETHUSDT");
        assert!(config.stream_url().contains("ethusdt@depth@100ms"));
        assert!(config.snapshot_url().contains("symbol=ETHUSDT&limit=500"));
        assert_eq!(config.snapshot_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_url_overrides_are_verbatim() {
        let config = Config::live()
            .with_stream_url("wss://example.test/ws")
            .with_snapshot_url("https://example.test/depth");
        assert_eq!(config.stream_url(), "wss://example.test/ws");
        assert_eq!(config.snapshot_url(), "https://example.test/depth");
    }
}
