//! # bookfeed
//!
//! A Binance depth-feed handler maintaining an in-memory limit order book
//! that answers "current best bid/ask" in real time.
//!
//! ## Features
//!
//! - **Fixed-capacity order book** - dual structure-of-arrays, 1000
//!   levels per side, in-place delta overwrite, vectorizable best-level
//!   scan with a runtime-selected strategy
//! - **Feed synchronization** - buffers the live delta stream, anchors it
//!   against an asynchronously fetched REST snapshot, and detects every
//!   update-id gap
//! - **Offline replay** - deterministic playback of gzipped captures, no
//!   network required
//! - **Async/Await** - built on Tokio; one background snapshot fetch per
//!   connection, cancellable on teardown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use bookfeed::{Config, Feed, OrderBook};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bookfeed::Error> {
//!     let book = Arc::new(Mutex::new(OrderBook::new()));
//!     let writer = Arc::clone(&book);
//!
//!     let feed = Feed::new(
//!         Config::live().with_symbol("BTCUSDT"),
//!         Arc::new(move |bp, bq, ap, aq| {
//!             let mut book = writer.lock();
//!             book.apply_bid_delta(bp, bq);
//!             book.apply_ask_delta(ap, aq);
//!         }),
//!     );
//!
//!     // Meanwhile, any other task may poll `book` for best bid/ask.
//!     feed.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Price Representation
//!
//! Prices and quantities are fixed-point integers:
//! - 1 price tick = 1e-4 of the quote currency (`30000.0` → `300000000`)
//! - 1 quantity unit = 1e-8 of the base currency (`0.5` → `50000000`)
//!
//! Integer ticks give exact comparisons and keep the level arrays dense
//! for the scan.
//!
//! ## Architecture
//!
//! - [`orderbook`] - the fixed-capacity book and its best-level scan
//! - [`sync`] - the snapshot/delta synchronization state machine
//! - [`replay`] - offline capture playback
//! - [`client`] - WebSocket stream and REST snapshot transports
//! - [`feed`] - the facade selecting live vs. replay and owning the
//!   connection lifecycle
//! - [`config`] - feed configuration
//! - [`error`] - error types for the crate
//!
//! ## Synchronization protocol
//!
//! A live connection starts out buffering deltas. The first buffered
//! delta triggers one background snapshot fetch; when it lands, deltas
//! the snapshot already covers are discarded, the snapshot is emitted as
//! one update, and the backlog is drained in order. From then on each
//! delta must chain exactly onto the last applied update id; any hole
//! fails the session rather than risk a silently wrong book.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod orderbook;
pub mod replay;
pub mod sync;
pub mod types;

// Re-export main types at crate root for convenience
pub use client::websocket::ReconnectConfig;
pub use config::{Config, FeedMode};
pub use error::Error;
pub use feed::Feed;
pub use orderbook::{OrderBook, ScanMode, DEPTH};
pub use replay::ReplaySource;
pub use sync::{SyncEngine, SyncStatus};
pub use types::{Price, Qty, UpdateFn};

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
