//! JSONL decision store.
//!
//! Every decision is appended as one JSON line and all reads replay the
//! file from the start.

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::{DecisionStore, StoreError};
use crate::domain::{AssetId, Decision, DecisionCounts};

/// File-based decision store using JSONL format
pub struct JsonlDecisionStore {
    /// Path to the decisions.jsonl file
    path: PathBuf,
}

impl JsonlDecisionStore {
    /// Create a store backed by the given file (created on first append)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open a store, making sure its parent directory exists
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay all decisions in append order
    pub async fn replay(&self) -> Result<Vec<Decision>, StoreError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut decisions = Vec::new();
        let mut pending_error: Option<StoreError> = None;
        let mut line_no = 0;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            // A bad line is only fatal if something follows it
            if let Some(err) = pending_error.take() {
                return Err(err);
            }

            match serde_json::from_str::<Decision>(&line) {
                Ok(decision) => decisions.push(decision),
                Err(source) => {
                    pending_error = Some(StoreError::Corrupt {
                        line: line_no,
                        source,
                    })
                }
            }
        }

        if let Some(err) = pending_error {
            warn!(path = %self.path.display(), error = %err, "Ignoring truncated final record");
        }

        Ok(decisions)
    }
}

#[async_trait]
impl DecisionStore for JsonlDecisionStore {
    async fn append(&self, decision: &Decision) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(decision)?;
        line.push('\n');
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut file = std::fs::OpenOptions::new()
                .read(true)
                .create(true)
                .append(true)
                .open(&path)?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .map_err(|e| StoreError::Lock(e.to_string()))?;

            let written = repair_tail(&mut file, &path)
                .and_then(|_| file.write_all(line.as_bytes()))
                .and_then(|_| file.flush());
            let unlocked = file.unlock();

            written?;
            unlocked.map_err(|e| StoreError::Lock(e.to_string()))?;
            Ok(())
        })
        .await??;

        Ok(())
    }

    async fn aggregate_counts(&self) -> Result<DecisionCounts, StoreError> {
        let decisions = self.replay().await?;
        Ok(decisions.iter().collect())
    }

    async fn decided_ids(&self) -> Result<HashSet<AssetId>, StoreError> {
        let decisions = self.replay().await?;
        Ok(decisions.into_iter().map(|d| d.asset_id).collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Decision>, StoreError> {
        let decisions = self.replay().await?;
        Ok(decisions.into_iter().rev().take(limit).collect())
    }
}

/// Make sure the file ends on a record boundary before appending.
///
/// A crash mid-write leaves a partial last line. It is cut off so the next
/// record starts on its own line; a complete record that only lacks its
/// newline gets one instead.
fn repair_tail(file: &mut std::fs::File, path: &Path) -> std::io::Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(());
    }

    // Find the start of the unterminated line
    let mut line_start = 0;
    let mut end = len;
    let mut buf = [0u8; 4096];
    while end > 0 {
        let start = end.saturating_sub(buf.len() as u64);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(chunk)?;
        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            line_start = start + pos as u64 + 1;
            break;
        }
        end = start;
    }

    let mut tail = Vec::with_capacity((len - line_start) as usize);
    file.seek(SeekFrom::Start(line_start))?;
    file.read_to_end(&mut tail)?;

    if serde_json::from_slice::<Decision>(&tail).is_ok() {
        file.write_all(b"\n")?;
    } else {
        warn!(
            path = %path.display(),
            bytes = tail.len(),
            "Dropping partial record left by an interrupted write"
        );
        file.set_len(line_start)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Asset, Direction};
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonlDecisionStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = JsonlDecisionStore::new(temp.path().join("decisions.jsonl"));
        (store, temp)
    }

    #[tokio::test]
    async fn test_replay_missing_file_is_empty() {
        let (store, _temp) = create_test_store();
        assert!(store.replay().await.unwrap().is_empty());
        assert_eq!(store.aggregate_counts().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_append_writes_one_line_per_decision() {
        let (store, _temp) = create_test_store();
        let asset = Asset::new("IMG_0001", Utc::now());

        store
            .append(&Decision::new(&asset, Direction::Keep))
            .await
            .unwrap();
        store
            .append(&Decision::new(&asset, Direction::Delete))
            .await
            .unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_truncated_final_line_is_ignored() {
        let (store, _temp) = create_test_store();
        let asset = Asset::new("IMG_0001", Utc::now());
        store
            .append(&Decision::new(&asset, Direction::Keep))
            .await
            .unwrap();

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(store.path())
            .unwrap();
        file.write_all(b"{\"id\":\"trunc").unwrap();

        let decisions = store.replay().await.unwrap();
        assert_eq!(decisions.len(), 1);
    }

    #[tokio::test]
    async fn test_append_after_truncated_line_keeps_every_record() {
        let (store, _temp) = create_test_store();
        let asset = Asset::new("IMG_0001", Utc::now());
        store
            .append(&Decision::new(&asset, Direction::Keep))
            .await
            .unwrap();

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(store.path())
            .unwrap();
        file.write_all(b"{\"id\":\"trunc").unwrap();

        let delete = Decision::new(&asset, Direction::Delete);
        let keep = Decision::new(&asset, Direction::Keep);
        store.append(&delete).await.unwrap();
        store.append(&keep).await.unwrap();

        let decisions = store.replay().await.unwrap();
        assert_eq!(decisions.len(), 3);
        assert_eq!(decisions[1], delete);
        assert_eq!(decisions[2], keep);

        let counts = store.aggregate_counts().await.unwrap();
        assert_eq!((counts.kept, counts.deleted), (2, 1));
    }

    #[tokio::test]
    async fn test_append_after_unterminated_record_keeps_it() {
        let (store, _temp) = create_test_store();
        let asset = Asset::new("IMG_0001", Utc::now());
        let first = Decision::new(&asset, Direction::Delete);

        std::fs::write(store.path(), serde_json::to_string(&first).unwrap()).unwrap();
        store
            .append(&Decision::new(&asset, Direction::Keep))
            .await
            .unwrap();

        let decisions = store.replay().await.unwrap();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0], first);
    }

    #[tokio::test]
    async fn test_corrupt_middle_line_fails() {
        let (store, _temp) = create_test_store();
        let asset = Asset::new("IMG_0001", Utc::now());

        std::fs::write(store.path(), "not json\n").unwrap();
        store
            .append(&Decision::new(&asset, Direction::Keep))
            .await
            .unwrap();

        let result = store.replay().await;
        assert!(matches!(result, Err(StoreError::Corrupt { line: 1, .. })));
    }
}
