//! WebSocket stream of incremental depth updates.
//!
//! The Binance market-data endpoint carries the subscription in the URL
//! path (`/ws/btcusdt@depth@100ms`), so there is no command handshake:
//! every text frame on the socket is one depth update. [`DepthStream`]
//! wraps the socket, answers pings, and decodes frames into
//! [`DepthUpdate`] values.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::Error;
use crate::types::DepthUpdate;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected incremental depth stream
///
/// # Thread Safety
///
/// This client is NOT thread-safe. Drive it from a single task; fan the
/// decoded updates out through the sync engine instead.
#[derive(Debug)]
pub struct DepthStream {
    inner: WsStream,
}

impl DepthStream {
    /// Connect to a depth stream URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the WebSocket handshake fails.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        tracing::info!(url = %url, "connecting to depth stream");
        let (inner, _response) = tokio_tungstenite::connect_async(url).await?;
        tracing::info!(url = %url, "depth stream connected");
        Ok(Self { inner })
    }

    /// Receive the next depth update.
    ///
    /// Pings are answered inline and non-text frames skipped. Returns
    /// `None` once the server closes the stream; a frame that is not a
    /// well-formed depth update is an error, because a skipped message
    /// would silently break update-id continuity.
    pub async fn next(&mut self) -> Option<Result<DepthUpdate, Error>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).map_err(Error::from));
                }
                Ok(Message::Ping(data)) => {
                    if let Err(e) = self.inner.send(Message::Pong(data)).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!(frame = ?frame, "depth stream closed by server");
                    return None;
                }
                Ok(_) => {
                    // Binary, Pong, Frame: nothing on this stream uses them.
                    continue;
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    /// Close the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails.
    pub async fn close(&mut self) -> Result<(), Error> {
        self.inner.close(None).await?;
        Ok(())
    }
}

/// Configuration for reconnection behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of consecutive failed sessions (0 = infinite)
    pub max_retries: u32,
    /// Initial delay between reconnection attempts
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Create a new reconnect config with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum retries (0 = infinite)
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set initial delay in milliseconds
    #[must_use]
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    /// Set maximum delay in milliseconds
    #[must_use]
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Set backoff multiplier
    #[must_use]
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate delay for a given retry attempt
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = delay.min(self.max_delay_ms as f64) as u64;
        std::time::Duration::from_millis(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reconnect_config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.initial_delay_ms, 100);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delay_calculation_caps_at_max() {
        let config = ReconnectConfig::new()
            .initial_delay_ms(100)
            .backoff_multiplier(2.0)
            .max_delay_ms(1000);

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(1000));
    }
}
