//! Wire types for the depth feed.
//!
//! These types match the JSON emitted by Binance's WebSocket and REST
//! APIs and are deserialized directly from the wire. Price and quantity
//! arrive as decimal strings; [`Levels`] holds their fixed-point form.

use serde::Deserialize;

use super::{price_to_ticks, qty_to_units, Price, Qty};
use crate::error::Error;

/// Incremental depth update from the `@depth` WebSocket stream.
///
/// Levels are `[price, quantity]` decimal-string pairs, best price first.
/// Envelope fields other than the sequence ids and the level lists
/// (`e`, `E`, `s`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthUpdate {
    /// First update id covered by this event.
    #[serde(rename = "U")]
    pub first_update_id: i64,
    /// Last update id covered by this event.
    #[serde(rename = "u")]
    pub last_update_id: i64,
    /// Bid levels as `[price, quantity]` string pairs.
    #[serde(rename = "b")]
    pub bids: Vec<[String; 2]>,
    /// Ask levels as `[price, quantity]` string pairs.
    #[serde(rename = "a")]
    pub asks: Vec<[String; 2]>,
}

/// One record of an offline capture: a depth message with the sequence
/// ids stripped. Captures are newline-delimited and gzip-compressed.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthRecord {
    /// Bid levels as `[price, quantity]` string pairs.
    #[serde(rename = "b")]
    pub bids: Vec<[String; 2]>,
    /// Ask levels as `[price, quantity]` string pairs.
    #[serde(rename = "a")]
    pub asks: Vec<[String; 2]>,
}

/// REST response for `/api/v3/depth`.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthSnapshot {
    /// Last update id already reflected in the snapshot.
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: i64,
    /// Bid levels as `[price, quantity]` string pairs.
    pub bids: Vec<[String; 2]>,
    /// Ask levels as `[price, quantity]` string pairs.
    pub asks: Vec<[String; 2]>,
}

/// One side's levels converted to fixed point, order preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Levels {
    /// Prices in 1e-4 ticks.
    pub px: Vec<Price>,
    /// Quantities in 1e-8 units.
    pub qty: Vec<Qty>,
}

impl Levels {
    /// Convert raw `[price, quantity]` string pairs to fixed point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decimal`] on the first malformed decimal.
    pub fn parse(raw: &[[String; 2]]) -> Result<Self, Error> {
        let mut px = Vec::with_capacity(raw.len());
        let mut qty = Vec::with_capacity(raw.len());
        for pair in raw {
            px.push(price_to_ticks(&pair[0])?);
            qty.push(qty_to_units(&pair[1])?);
        }
        Ok(Self { px, qty })
    }
}
