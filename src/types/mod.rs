//! Fixed-point primitives and wire types for the depth feed.
//!
//! This module contains the integer price/quantity representation used
//! throughout the crate and the serde types matching the JSON emitted by
//! the exchange:
//!
//! - [`messages`] - Depth update, replay record, and snapshot shapes

pub mod messages;

pub use messages::{DepthRecord, DepthSnapshot, DepthUpdate, Levels};

use std::sync::Arc;

use crate::error::Error;

/// Price in ticks, where 1 tick = 1e-4 of the quote currency
///
/// `30000.0` USDT is stored as `300_000_000`. Integer ticks instead of
/// floating point for:
/// - Exact arithmetic (no floating point errors)
/// - Faster comparisons
/// - Cache efficiency in the level arrays
pub type Price = i64;

/// Quantity in base-currency units of 1e-8 (satoshis for BTC pairs)
///
/// `0.5` BTC is stored as `50_000_000`. A quantity of zero marks an
/// unoccupied level slot.
pub type Qty = i64;

/// Ticks per whole unit of quote-currency price
pub const PRICE_SCALE: f64 = 1e4;

/// Units per whole unit of base-currency quantity
pub const QTY_SCALE: f64 = 1e8;

/// Callback invoked once per applied update with the four parallel level
/// sequences: bid prices, bid quantities, ask prices, ask quantities.
///
/// Within a side the price and quantity slices have equal length. The
/// callback is shared between connections, so consumers that mutate state
/// wrap it in their own lock; applying both sides under a single lock
/// acquisition keeps readers from observing a bid-only transient.
pub type UpdateFn = Arc<dyn Fn(&[Price], &[Qty], &[Price], &[Qty]) + Send + Sync>;

/// Convert a decimal price string to ticks: `round(value * 1e4)`.
///
/// # Errors
///
/// Returns [`Error::Decimal`] if the string is not a valid decimal.
pub fn price_to_ticks(s: &str) -> Result<Price, Error> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| Error::Decimal(s.to_string()))?;
    Ok((value * PRICE_SCALE).round() as Price)
}

/// Convert a decimal quantity string to 1e-8 units: `round(value * 1e8)`.
///
/// # Errors
///
/// Returns [`Error::Decimal`] if the string is not a valid decimal.
pub fn qty_to_units(s: &str) -> Result<Qty, Error> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| Error::Decimal(s.to_string()))?;
    Ok((value * QTY_SCALE).round() as Qty)
}
