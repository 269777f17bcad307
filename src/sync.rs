//! Depth-stream synchronization engine.
//!
//! Binance's incremental depth stream only makes sense relative to a REST
//! snapshot: every delta carries the update-id range `[U, u]` it covers,
//! and a delta applies to a book at id `L` only when `U <= L+1 <= u`.
//! This module reconciles a buffered delta backlog against an
//! asynchronously fetched snapshot and hands every applicable update to a
//! single callback, in order, exactly once.
//!
//! The engine is a pure state machine: no sockets, no HTTP, no JSON. The
//! feed facade owns the transport and the snapshot task and drives
//! [`SyncEngine::on_delta`] / [`SyncEngine::on_snapshot`] under one lock,
//! which is what serializes the receive loop against snapshot completion.
//!
//! # States
//!
//! - `Buffering` - deltas are queued; a snapshot fetch is (or will be)
//!   in flight.
//! - `Synced` - deltas apply directly as long as their id range chains
//!   onto `last_update_id`.
//! - `Failed` - continuity broke. Terminal: the owner must tear down the
//!   connection and start over with a fresh engine.

use std::collections::VecDeque;
use std::fmt;

use crate::error::Error;
use crate::types::{DepthSnapshot, DepthUpdate, Levels, UpdateFn};

/// Synchronization status of a live connection's book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Buffering deltas until a snapshot anchors the book.
    Buffering,
    /// Snapshot applied; deltas are applied as they arrive.
    Synced,
    /// Update-id continuity broke; the connection must be rebuilt.
    Failed,
}

/// What [`SyncEngine::on_delta`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaAction {
    /// Message buffered and a snapshot fetch should be started now.
    FetchSnapshot,
    /// Message buffered behind an already-outstanding fetch.
    Buffered,
    /// Message applied; the callback fired.
    Applied,
    /// Stale or duplicate message; dropped.
    Ignored,
}

/// Outcome of reconciling a snapshot against the backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotAction {
    /// Snapshot and backlog applied; the engine is live.
    Synced,
    /// Every buffered delta predates the snapshot. The fetch latch is
    /// cleared; the next delta triggers a fresh fetch.
    Refetch,
}

/// Protocol state machine for one live connection.
///
/// Owns the update callback and the pending-delta queue. One instance per
/// connection; a [`SyncStatus::Failed`] engine never recovers. Recovery
/// is a fresh connection running the whole handshake again.
pub struct SyncEngine {
    status: SyncStatus,
    last_update_id: i64,
    pending: VecDeque<DepthUpdate>,
    snapshot_requested: bool,
    on_update: UpdateFn,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("status", &self.status)
            .field("last_update_id", &self.last_update_id)
            .field("pending", &self.pending.len())
            .field("snapshot_requested", &self.snapshot_requested)
            .finish()
    }
}

impl SyncEngine {
    /// Create an engine in `Buffering` with an empty backlog.
    #[must_use]
    pub fn new(on_update: UpdateFn) -> Self {
        Self {
            status: SyncStatus::Buffering,
            last_update_id: 0,
            pending: VecDeque::new(),
            snapshot_requested: false,
            on_update,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> SyncStatus {
        self.status
    }

    /// End id of the most recently applied update (0 before sync).
    #[must_use]
    pub const fn last_update_id(&self) -> i64 {
        self.last_update_id
    }

    /// Number of buffered deltas awaiting the snapshot.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether a snapshot fetch is currently outstanding.
    #[must_use]
    pub const fn snapshot_requested(&self) -> bool {
        self.snapshot_requested
    }

    /// Feed one depth delta from the stream.
    ///
    /// While buffering, the delta is queued; the first queued delta after
    /// connect (or after a cleared fetch latch) asks the caller to start
    /// the one background snapshot fetch. While synced, the delta is
    /// applied, ignored as stale, or fails the engine on a gap.
    ///
    /// # Errors
    ///
    /// [`Error::SequenceGap`] on a gap (the engine latches `Failed`) and
    /// [`Error::Desynced`] for any call on an already-failed engine.
    pub fn on_delta(&mut self, update: DepthUpdate) -> Result<DeltaAction, Error> {
        match self.status {
            SyncStatus::Failed => Err(Error::Desynced),
            SyncStatus::Buffering => {
                self.pending.push_back(update);
                if self.snapshot_requested {
                    Ok(DeltaAction::Buffered)
                } else {
                    self.snapshot_requested = true;
                    Ok(DeltaAction::FetchSnapshot)
                }
            }
            SyncStatus::Synced => {
                let next = self.last_update_id + 1;
                if update.last_update_id < next {
                    // Stale or duplicate; Binance replays these around
                    // stream restarts.
                    return Ok(DeltaAction::Ignored);
                }
                if update.first_update_id > next {
                    self.status = SyncStatus::Failed;
                    return Err(Error::SequenceGap {
                        expected: next,
                        got: update.first_update_id,
                    });
                }
                let end = update.last_update_id;
                self.apply(&update)?;
                self.last_update_id = end;
                Ok(DeltaAction::Applied)
            }
        }
    }

    /// Reconcile a fetched snapshot against the buffered backlog.
    ///
    /// Buffered deltas wholly covered by the snapshot (`u <= lastUpdateId`)
    /// are discarded from the front. If that empties the backlog the
    /// snapshot raced ahead of the stream: the fetch latch is cleared and
    /// [`SnapshotAction::Refetch`] returned. Otherwise the oldest
    /// survivor must straddle `lastUpdateId + 1`; the snapshot is emitted
    /// as one update and the backlog drained oldest-first.
    ///
    /// # Errors
    ///
    /// [`Error::StaleSnapshot`] when the backlog has already moved past
    /// the snapshot, [`Error::SequenceGap`] on a hole inside the backlog,
    /// [`Error::Decimal`] on a malformed level. All three latch `Failed`.
    pub fn on_snapshot(&mut self, snapshot: DepthSnapshot) -> Result<SnapshotAction, Error> {
        match self.status {
            SyncStatus::Failed => return Err(Error::Desynced),
            // A duplicate fetch finishing late has nothing to add.
            SyncStatus::Synced => return Ok(SnapshotAction::Synced),
            SyncStatus::Buffering => {}
        }

        let snapshot_id = snapshot.last_update_id;
        while self
            .pending
            .front()
            .is_some_and(|d| d.last_update_id <= snapshot_id)
        {
            self.pending.pop_front();
        }

        let Some((front_first, front_last)) = self
            .pending
            .front()
            .map(|d| (d.first_update_id, d.last_update_id))
        else {
            self.snapshot_requested = false;
            return Ok(SnapshotAction::Refetch);
        };

        let next = snapshot_id + 1;
        if front_first > next || front_last < next {
            self.status = SyncStatus::Failed;
            self.pending.clear();
            return Err(Error::StaleSnapshot {
                snapshot_id,
                first_update_id: front_first,
            });
        }

        let bids = self.parse(&snapshot.bids)?;
        let asks = self.parse(&snapshot.asks)?;
        (self.on_update)(&bids.px, &bids.qty, &asks.px, &asks.qty);
        self.last_update_id = snapshot_id;
        self.status = SyncStatus::Synced;

        while let Some(delta) = self.pending.pop_front() {
            let next = self.last_update_id + 1;
            if delta.first_update_id <= next && next <= delta.last_update_id {
                let end = delta.last_update_id;
                self.apply(&delta)?;
                self.last_update_id = end;
            } else {
                self.status = SyncStatus::Failed;
                self.pending.clear();
                return Err(Error::SequenceGap {
                    expected: next,
                    got: delta.first_update_id,
                });
            }
        }

        Ok(SnapshotAction::Synced)
    }

    /// Clear the fetch latch after a failed or timed-out snapshot fetch.
    ///
    /// The engine stays `Buffering`; the next delta returns
    /// [`DeltaAction::FetchSnapshot`] so the owner retries.
    pub fn snapshot_fetch_failed(&mut self) {
        if self.status == SyncStatus::Buffering {
            self.snapshot_requested = false;
        }
    }

    /// Convert one delta's levels and emit them through the callback.
    fn apply(&mut self, update: &DepthUpdate) -> Result<(), Error> {
        let bids = self.parse(&update.bids)?;
        let asks = self.parse(&update.asks)?;
        (self.on_update)(&bids.px, &bids.qty, &asks.px, &asks.qty);
        Ok(())
    }

    /// A level list that fails fixed-point conversion cannot be skipped
    /// without breaking id continuity, so it fails the engine.
    fn parse(&mut self, raw: &[[String; 2]]) -> Result<Levels, Error> {
        match Levels::parse(raw) {
            Ok(levels) => Ok(levels),
            Err(e) => {
                self.status = SyncStatus::Failed;
                self.pending.clear();
                Err(e)
            }
        }
    }
}
