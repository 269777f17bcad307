//! Error types for the bookfeed crate.
//!
//! One enum covers the crate's failure taxonomy: transport failures
//! (fatal to the current connection), decode failures, protocol desync
//! (gap or stale snapshot, fatal until a full resync), and resource
//! errors surfaced before processing starts.

use thiserror::Error;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (replay capture open/read)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration (bad URL, missing source)
    #[error("configuration error: {0}")]
    Config(String),

    /// A price or quantity field was not a valid decimal
    #[error("malformed decimal field: {0:?}")]
    Decimal(String),

    /// Update-id continuity broke: messages were missed
    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap {
        /// Update id the book needed next
        expected: i64,
        /// First update id the offending message carried
        got: i64,
    },

    /// The REST snapshot predates the buffered delta backlog
    #[error("snapshot {snapshot_id} is stale for backlog starting at {first_update_id}")]
    StaleSnapshot {
        /// `lastUpdateId` reported by the snapshot
        snapshot_id: i64,
        /// First update id of the oldest buffered delta
        first_update_id: i64,
    },

    /// The engine already failed; only a fresh connection can recover
    #[error("order book desynchronized; reconnect required")]
    Desynced,

    /// WebSocket connection closed unexpectedly
    #[error("connection closed")]
    ConnectionClosed,

    /// A background task was cancelled or panicked
    #[error("background task failed: {0}")]
    Task(String),
}
