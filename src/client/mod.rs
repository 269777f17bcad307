//! Transport clients for the live feed.
//!
//! This module contains:
//!
//! - [`rest`] - REST client fetching the one depth snapshot per sync
//! - [`websocket`] - WebSocket stream of incremental depth updates

pub mod rest;
pub mod websocket;

pub use rest::{SnapshotClient, SnapshotFetcher};
pub use websocket::{DepthStream, ReconnectConfig};
