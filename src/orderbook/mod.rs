//! Fixed-capacity order book.
//!
//! The book is a dual structure-of-arrays holding [`DEPTH`] price levels
//! per side. Updates overwrite slots in place and the best level is found
//! by scanning for the first non-zero quantity, so the hot read path is a
//! branch-light linear pass the compiler can vectorize.
//!
//! # Example
//!
//! ```rust
//! use bookfeed::orderbook::OrderBook;
//!
//! let mut book = OrderBook::new();
//! book.apply_bid_delta(&[300_000_000], &[50_000_000]);
//! book.apply_ask_delta(&[300_100_000], &[100_000_000]);
//!
//! assert_eq!(book.best_bid(), Some(0));
//! if let Some((price, qty)) = book.best_ask_level() {
//!     println!("Best ask: {} @ {}", qty, price);
//! }
//! ```

pub mod book;

pub use book::{OrderBook, ScanMode, DEPTH};
