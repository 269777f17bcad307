//! Feed facade: one entry point for live and replay sessions.
//!
//! [`Feed`] selects the input path from its [`Config`], owns the
//! connection lifecycle, and owns the single background snapshot-fetch
//! task of the live path. The receive loop and the snapshot completion
//! both land in one `Mutex<SyncEngine>`, which is the serialization
//! point the protocol requires: message arrival order alone does not
//! order the two call sites.
//!
//! Protocol failures are loud. A desynchronized session returns an error
//! from [`Feed::run`]; [`Feed::run_with_reconnect`] is the
//! connection-manager loop that rebuilds the session (fresh connection,
//! fresh engine) with exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::client::rest::{SnapshotClient, SnapshotFetcher};
use crate::client::websocket::{DepthStream, ReconnectConfig};
use crate::config::{Config, FeedMode};
use crate::error::Error;
use crate::replay::ReplaySource;
use crate::sync::{DeltaAction, SnapshotAction, SyncEngine};
use crate::types::{DepthUpdate, UpdateFn};

/// Source of decoded depth updates driving the live loop.
///
/// `DepthStream` is the production implementation; tests drive the loop
/// through a channel.
trait UpdateSource {
    fn next_update(&mut self) -> impl Future<Output = Option<Result<DepthUpdate, Error>>> + Send;
}

impl UpdateSource for DepthStream {
    fn next_update(&mut self) -> impl Future<Output = Option<Result<DepthUpdate, Error>>> + Send {
        self.next()
    }
}

/// The depth feed
///
/// Construct with a [`Config`] and an update callback, then call
/// [`run`](Self::run). The callback receives every applied update,
/// snapshot or delta, as four parallel fixed-point sequences.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use bookfeed::{Config, Feed, OrderBook};
///
/// # async fn example() -> Result<(), bookfeed::Error> {
/// let book = Arc::new(Mutex::new(OrderBook::new()));
/// let writer = Arc::clone(&book);
///
/// let feed = Feed::new(
///     Config::live(),
///     Arc::new(move |bp, bq, ap, aq| {
///         // One lock for both sides: readers never see a half-applied update.
///         let mut book = writer.lock();
///         book.apply_bid_delta(bp, bq);
///         book.apply_ask_delta(ap, aq);
///     }),
/// );
/// feed.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Feed {
    config: Config,
    on_update: UpdateFn,
}

impl std::fmt::Debug for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Feed {
    /// Create a feed from a configuration and an update callback.
    #[must_use]
    pub fn new(config: Config, on_update: UpdateFn) -> Self {
        Self { config, on_update }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one session to completion.
    ///
    /// Replay: blocks until end of capture. Live: blocks until the
    /// server closes the stream or the session fails. Returns the number
    /// of updates the receive loop applied.
    ///
    /// # Errors
    ///
    /// Transport, resource, and protocol failures all surface here;
    /// none are retried internally.
    pub async fn run(&self) -> Result<u64, Error> {
        match self.config.mode() {
            FeedMode::Replay => self.run_replay().await,
            FeedMode::Live => {
                let (applied, err) = self.live_session().await;
                match err {
                    None => Ok(applied),
                    Some(e) => Err(e),
                }
            }
        }
    }

    /// Run live sessions until retries are exhausted, reconnecting with
    /// exponential backoff.
    ///
    /// Every reconnect builds a fresh connection and a fresh sync engine,
    /// so each session re-runs the full snapshot handshake. A session
    /// that applied updates resets the backoff schedule. Replay
    /// configurations run once, as in [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns the last session's error once `max_retries` consecutive
    /// fruitless sessions have failed.
    pub async fn run_with_reconnect(&self, reconnect: ReconnectConfig) -> Result<u64, Error> {
        if self.config.mode() == FeedMode::Replay {
            return self.run().await;
        }

        let mut attempt: u32 = 0;
        let mut total: u64 = 0;
        loop {
            let (applied, err) = self.live_session().await;
            total += applied;
            let Some(e) = err else {
                return Ok(total);
            };
            if applied > 0 {
                attempt = 0;
            }
            if reconnect.max_retries > 0 && attempt >= reconnect.max_retries {
                tracing::error!(error = %e, attempts = attempt, "reconnect budget exhausted");
                return Err(e);
            }
            let delay = reconnect.delay_for_attempt(attempt);
            tracing::warn!(
                error = %e,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "live session ended; reconnecting"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn run_replay(&self) -> Result<u64, Error> {
        let path = self
            .config
            .replay_path()
            .ok_or_else(|| Error::Config("replay mode without a capture path".to_string()))?
            .to_path_buf();
        let on_update = Arc::clone(&self.on_update);
        tokio::task::spawn_blocking(move || ReplaySource::new(path).run(&on_update))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }

    /// One live connection from handshake to teardown.
    async fn live_session(&self) -> (u64, Option<Error>) {
        let stream = match DepthStream::connect(&self.config.stream_url()).await {
            Ok(stream) => stream,
            Err(e) => return (0, Some(e)),
        };
        let fetcher = match SnapshotClient::new(&self.config) {
            Ok(fetcher) => Arc::new(fetcher),
            Err(e) => return (0, Some(e)),
        };
        let engine = Arc::new(Mutex::new(SyncEngine::new(Arc::clone(&self.on_update))));
        run_sync_loop(stream, fetcher, engine, self.config.snapshot_timeout()).await
    }
}

/// Drive the synchronization protocol over one connection.
///
/// Returns the number of deltas applied by the receive loop and the
/// error that ended the session, if any. Tears down the in-flight
/// snapshot fetch before returning so no update is left half-applied.
async fn run_sync_loop<S, F>(
    mut source: S,
    fetcher: Arc<F>,
    engine: Arc<Mutex<SyncEngine>>,
    snapshot_timeout: Duration,
) -> (u64, Option<Error>)
where
    S: UpdateSource,
    F: SnapshotFetcher + 'static,
{
    let mut fetch_task: Option<JoinHandle<()>> = None;
    let mut applied: u64 = 0;

    let err = loop {
        let update = match source.next_update().await {
            None => break None,
            Some(Err(e)) => break Some(e),
            Some(Ok(update)) => update,
        };
        let action = engine.lock().on_delta(update);
        match action {
            Ok(DeltaAction::FetchSnapshot) => {
                tracing::debug!("backlog opened; starting snapshot fetch");
                fetch_task = Some(spawn_snapshot_fetch(
                    Arc::clone(&fetcher),
                    Arc::clone(&engine),
                    snapshot_timeout,
                ));
            }
            Ok(DeltaAction::Applied) => applied += 1,
            Ok(DeltaAction::Buffered | DeltaAction::Ignored) => {}
            Err(e) => {
                tracing::error!(error = %e, "depth stream desynchronized");
                break Some(e);
            }
        }
    };

    if let Some(task) = fetch_task {
        task.abort();
    }
    (applied, err)
}

/// The at-most-one background snapshot fetch of a connection.
///
/// Fetch failures and timeouts re-arm the engine's fetch latch; only
/// reconciliation errors fail the session (discovered by the receive
/// loop on its next delta).
fn spawn_snapshot_fetch<F>(
    fetcher: Arc<F>,
    engine: Arc<Mutex<SyncEngine>>,
    snapshot_timeout: Duration,
) -> JoinHandle<()>
where
    F: SnapshotFetcher + 'static,
{
    tokio::spawn(async move {
        let outcome = tokio::time::timeout(snapshot_timeout, fetcher.fetch()).await;
        let mut engine = engine.lock();
        match outcome {
            Ok(Ok(snapshot)) => match engine.on_snapshot(snapshot) {
                Ok(SnapshotAction::Synced) => {
                    tracing::info!(
                        last_update_id = engine.last_update_id(),
                        "book synchronized"
                    );
                }
                Ok(SnapshotAction::Refetch) => {
                    tracing::warn!("snapshot predates entire backlog; refetching on next delta");
                }
                Err(e) => {
                    tracing::error!(error = %e, "snapshot reconciliation failed");
                }
            },
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "snapshot fetch failed; retrying on next delta");
                engine.snapshot_fetch_failed();
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = snapshot_timeout.as_millis() as u64,
                    "snapshot fetch timed out; retrying on next delta"
                );
                engine.snapshot_fetch_failed();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncStatus;
    use crate::types::DepthSnapshot;
    use tokio::sync::mpsc;

    type Emitted = (Vec<i64>, Vec<i64>, Vec<i64>, Vec<i64>);

    fn recording_cb() -> (Arc<Mutex<Vec<Emitted>>>, UpdateFn) {
        let log: Arc<Mutex<Vec<Emitted>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let cb: UpdateFn = Arc::new(move |bp, bq, ap, aq| {
            sink.lock()
                .push((bp.to_vec(), bq.to_vec(), ap.to_vec(), aq.to_vec()));
        });
        (log, cb)
    }

    fn delta(first: i64, last: i64) -> DepthUpdate {
        DepthUpdate {
            first_update_id: first,
            last_update_id: last,
            bids: vec![["30000.0".into(), "0.5".into()]],
            asks: vec![["30010.0".into(), "1.0".into()]],
        }
    }

    fn snapshot(id: i64) -> DepthSnapshot {
        DepthSnapshot {
            last_update_id: id,
            bids: vec![["29999.0".into(), "2.0".into()]],
            asks: vec![["30001.0".into(), "3.0".into()]],
        }
    }

    struct ChannelSource {
        rx: mpsc::Receiver<Result<DepthUpdate, Error>>,
    }

    impl UpdateSource for ChannelSource {
        fn next_update(
            &mut self,
        ) -> impl Future<Output = Option<Result<DepthUpdate, Error>>> + Send {
            self.rx.recv()
        }
    }

    struct StaticFetcher {
        snapshot: DepthSnapshot,
    }

    impl SnapshotFetcher for StaticFetcher {
        fn fetch(&self) -> impl Future<Output = Result<DepthSnapshot, Error>> + Send {
            let snapshot = self.snapshot.clone();
            async move { Ok(snapshot) }
        }
    }

    struct FailingFetcher;

    impl SnapshotFetcher for FailingFetcher {
        fn fetch(&self) -> impl Future<Output = Result<DepthSnapshot, Error>> + Send {
            async { Err(Error::ConnectionClosed) }
        }
    }

    async fn wait_until(engine: &Arc<Mutex<SyncEngine>>, pred: impl Fn(&SyncEngine) -> bool) {
        for _ in 0..500 {
            if pred(&engine.lock()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("engine never reached the expected state");
    }

    #[tokio::test]
    async fn test_live_loop_syncs_then_streams() {
        let (log, cb) = recording_cb();
        let engine = Arc::new(Mutex::new(SyncEngine::new(cb)));
        let (tx, rx) = mpsc::channel(16);
        let fetcher = Arc::new(StaticFetcher {
            snapshot: snapshot(12),
        });

        let loop_task = tokio::spawn(run_sync_loop(
            ChannelSource { rx },
            fetcher,
            Arc::clone(&engine),
            Duration::from_secs(1),
        ));

        tx.send(Ok(delta(13, 13))).await.unwrap();
        wait_until(&engine, |e| e.status() == SyncStatus::Synced).await;
        tx.send(Ok(delta(14, 15))).await.unwrap();
        tx.send(Ok(delta(16, 16))).await.unwrap();
        drop(tx);

        let (applied, err) = loop_task.await.unwrap();
        assert!(err.is_none());
        assert_eq!(applied, 2);

        // Snapshot, buffered delta, then the two live deltas: once each,
        // in order, regardless of task interleaving.
        let emitted = log.lock();
        assert_eq!(emitted.len(), 4);
        assert_eq!(emitted[0].0, vec![299_990_000]);
        assert_eq!(emitted[1].0, vec![300_000_000]);
        assert_eq!(engine.lock().last_update_id(), 16);
    }

    #[tokio::test]
    async fn test_live_loop_fails_loudly_on_gap() {
        let (log, cb) = recording_cb();
        let engine = Arc::new(Mutex::new(SyncEngine::new(cb)));
        let (tx, rx) = mpsc::channel(16);
        let fetcher = Arc::new(StaticFetcher {
            snapshot: snapshot(12),
        });

        let loop_task = tokio::spawn(run_sync_loop(
            ChannelSource { rx },
            fetcher,
            Arc::clone(&engine),
            Duration::from_secs(1),
        ));

        tx.send(Ok(delta(13, 13))).await.unwrap();
        wait_until(&engine, |e| e.status() == SyncStatus::Synced).await;
        let emitted_before = log.lock().len();
        tx.send(Ok(delta(20, 22))).await.unwrap(); // hole: 14..19

        let (_applied, err) = loop_task.await.unwrap();
        assert!(matches!(
            err,
            Some(Error::SequenceGap {
                expected: 14,
                got: 20
            })
        ));
        assert_eq!(engine.lock().status(), SyncStatus::Failed);
        assert_eq!(log.lock().len(), emitted_before);
    }

    #[tokio::test]
    async fn test_failed_fetch_rearms_and_retries() {
        let (log, cb) = recording_cb();
        let engine = Arc::new(Mutex::new(SyncEngine::new(cb)));
        let (tx, rx) = mpsc::channel(16);

        let loop_task = tokio::spawn(run_sync_loop(
            ChannelSource { rx },
            Arc::new(FailingFetcher),
            Arc::clone(&engine),
            Duration::from_secs(1),
        ));

        tx.send(Ok(delta(10, 12))).await.unwrap();
        // The failed fetch clears the latch without failing the session.
        wait_until(&engine, |e| !e.snapshot_requested() && e.pending_len() == 1).await;
        tx.send(Ok(delta(13, 15))).await.unwrap();
        wait_until(&engine, |e| e.pending_len() == 2).await;
        drop(tx);

        let (applied, err) = loop_task.await.unwrap();
        assert!(err.is_none());
        assert_eq!(applied, 0);
        assert_eq!(engine.lock().status(), SyncStatus::Buffering);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_ends_the_session() {
        let (_log, cb) = recording_cb();
        let engine = Arc::new(Mutex::new(SyncEngine::new(cb)));
        let (tx, rx) = mpsc::channel(16);

        let loop_task = tokio::spawn(run_sync_loop(
            ChannelSource { rx },
            Arc::new(StaticFetcher {
                snapshot: snapshot(12),
            }),
            Arc::clone(&engine),
            Duration::from_secs(1),
        ));

        tx.send(Err(Error::ConnectionClosed)).await.unwrap();
        let (applied, err) = loop_task.await.unwrap();
        assert_eq!(applied, 0);
        assert!(matches!(err, Some(Error::ConnectionClosed)));
    }
}
