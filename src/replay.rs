//! Offline capture replay.
//!
//! Captures are gzip-compressed, newline-delimited depth records with
//! the sequence ids stripped: the recording process already ordered
//! them, so no synchronization state is needed. Each well-formed record
//! produces exactly one callback invocation, in file order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::Error;
use crate::types::{DepthRecord, Levels, UpdateFn};

/// Deterministic driver replaying a recorded capture through the update
/// callback.
///
/// Malformed records are skipped, not fatal: captures are assumed mostly
/// well-formed and offline completeness is not safety-critical. An
/// unreadable file is fatal before processing starts.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    path: PathBuf,
}

impl ReplaySource {
    /// Create a replay source for the given capture file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the capture file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay the capture, invoking the callback once per record.
    ///
    /// Blocks until end of input and returns the number of records
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the capture cannot be opened or the
    /// compressed stream is unreadable.
    pub fn run(&self, on_update: &UpdateFn) -> Result<u64, Error> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(GzDecoder::new(file));

        let mut applied: u64 = 0;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: DepthRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!(lineno, error = %e, "skipping malformed capture line");
                    continue;
                }
            };
            let (bids, asks) = match (Levels::parse(&record.bids), Levels::parse(&record.asks)) {
                (Ok(bids), Ok(asks)) => (bids, asks),
                _ => {
                    tracing::debug!(lineno, "skipping record with malformed decimals");
                    continue;
                }
            };
            on_update(&bids.px, &bids.qty, &asks.px, &asks.qty);
            applied += 1;
        }

        tracing::info!(path = %self.path.display(), records = applied, "replay finished");
        Ok(applied)
    }
}
