//! Decision recorder.
//!
//! Owns the decision store inside a single writer task. Appends are queued
//! and return immediately, so a slow store never holds up the swipe path.
//! Reads go through the same task and therefore see every earlier append.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::domain::{AssetId, Decision, DecisionCounts};
use crate::store::{DecisionStore, StoreError};

/// Errors returned by recorder reads
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Decision recorder has shut down")]
    Closed,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

enum Command {
    Append(Decision),
    Counts(Reply<DecisionCounts>),
    DecidedIds(Reply<HashSet<AssetId>>),
    Recent(usize, Reply<Vec<Decision>>),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct RecorderStats {
    appended: AtomicU64,
    failed: AtomicU64,
}

/// Handle to the single-writer decision task
#[derive(Clone)]
pub struct DecisionRecorder {
    tx: mpsc::UnboundedSender<Command>,
    stats: Arc<RecorderStats>,
}

impl DecisionRecorder {
    /// Start the writer task for a store
    pub fn spawn(store: Arc<dyn DecisionStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(RecorderStats::default());

        tokio::spawn(run_writer(store, rx, Arc::clone(&stats)));

        Self { tx, stats }
    }

    /// Queue a decision for writing. Never blocks.
    ///
    /// Failures are logged and counted; the caller is not told.
    pub fn append(&self, decision: Decision) {
        let asset_id = decision.asset_id.clone();
        if self.tx.send(Command::Append(decision)).is_err() {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            error!(asset_id = %asset_id, "Decision recorder closed; decision dropped");
        }
    }

    pub async fn aggregate_counts(&self) -> Result<DecisionCounts, RecorderError> {
        self.request(Command::Counts).await
    }

    pub async fn count_kept(&self) -> Result<usize, RecorderError> {
        Ok(self.aggregate_counts().await?.kept)
    }

    pub async fn count_deleted(&self) -> Result<usize, RecorderError> {
        Ok(self.aggregate_counts().await?.deleted)
    }

    pub async fn decided_ids(&self) -> Result<HashSet<AssetId>, RecorderError> {
        self.request(Command::DecidedIds).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<Decision>, RecorderError> {
        self.request(|reply| Command::Recent(limit, reply)).await
    }

    /// Wait until every decision queued so far has been written (or failed)
    pub async fn flush(&self) -> Result<(), RecorderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply))
            .map_err(|_| RecorderError::Closed)?;
        rx.await.map_err(|_| RecorderError::Closed)
    }

    /// Drain queued writes and stop the writer task
    pub async fn shutdown(&self) -> Result<(), RecorderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(reply))
            .map_err(|_| RecorderError::Closed)?;
        rx.await.map_err(|_| RecorderError::Closed)
    }

    /// Decisions written successfully
    pub fn appended(&self) -> u64 {
        self.stats.appended.load(Ordering::Relaxed)
    }

    /// Decisions that could not be written
    pub fn failed_appends(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    async fn request<T, F>(&self, make: F) -> Result<T, RecorderError>
    where
        F: FnOnce(Reply<T>) -> Command,
    {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| RecorderError::Closed)?;
        let result = rx.await.map_err(|_| RecorderError::Closed)?;
        Ok(result?)
    }
}

async fn run_writer(
    store: Arc<dyn DecisionStore>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    stats: Arc<RecorderStats>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Append(decision) => match store.append(&decision).await {
                Ok(()) => {
                    stats.appended.fetch_add(1, Ordering::Relaxed);
                    debug!(asset_id = %decision.asset_id, kept = decision.kept, "Recorded decision");
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        asset_id = %decision.asset_id,
                        kept = decision.kept,
                        error = %e,
                        "Failed to record decision"
                    );
                }
            },
            Command::Counts(reply) => {
                let _ = reply.send(store.aggregate_counts().await);
            }
            Command::DecidedIds(reply) => {
                let _ = reply.send(store.decided_ids().await);
            }
            Command::Recent(limit, reply) => {
                let _ = reply.send(store.recent(limit).await);
            }
            Command::Flush(reply) => {
                let _ = reply.send(());
            }
            Command::Shutdown(reply) => {
                info!(
                    appended = stats.appended.load(Ordering::Relaxed),
                    failed = stats.failed.load(Ordering::Relaxed),
                    "Decision recorder stopped"
                );
                let _ = reply.send(());
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Asset, Direction};
    use crate::store::SqliteDecisionStore;
    use async_trait::async_trait;
    use chrono::Utc;

    struct BrokenStore;

    #[async_trait]
    impl DecisionStore for BrokenStore {
        async fn append(&self, _decision: &Decision) -> Result<(), StoreError> {
            Err(StoreError::Lock("disk on fire".to_string()))
        }

        async fn aggregate_counts(&self) -> Result<DecisionCounts, StoreError> {
            Ok(DecisionCounts::default())
        }

        async fn decided_ids(&self) -> Result<HashSet<AssetId>, StoreError> {
            Ok(HashSet::new())
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<Decision>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_reads_observe_earlier_appends() {
        let store = Arc::new(SqliteDecisionStore::open_in_memory().unwrap());
        let recorder = DecisionRecorder::spawn(store);
        let asset = Asset::new("IMG_0001", Utc::now());

        recorder.append(Decision::new(&asset, Direction::Keep));
        recorder.append(Decision::new(&asset, Direction::Delete));

        // No flush needed: the read queues behind the appends
        assert_eq!(recorder.count_kept().await.unwrap(), 1);
        assert_eq!(recorder.count_deleted().await.unwrap(), 1);
        assert_eq!(recorder.appended(), 2);
    }

    #[tokio::test]
    async fn test_failed_append_is_counted_not_raised() {
        let recorder = DecisionRecorder::spawn(Arc::new(BrokenStore));
        let asset = Asset::new("IMG_0001", Utc::now());

        recorder.append(Decision::new(&asset, Direction::Keep));
        recorder.flush().await.unwrap();

        assert_eq!(recorder.failed_appends(), 1);
        assert_eq!(recorder.appended(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_recorder() {
        let store = Arc::new(SqliteDecisionStore::open_in_memory().unwrap());
        let recorder = DecisionRecorder::spawn(store);

        recorder.shutdown().await.unwrap();

        assert!(matches!(
            recorder.aggregate_counts().await,
            Err(RecorderError::Closed)
        ));

        let asset = Asset::new("IMG_0001", Utc::now());
        recorder.append(Decision::new(&asset, Direction::Keep));
        assert_eq!(recorder.failed_appends(), 1);
    }
}
