//! SQLite decision store.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::schema;
use super::{DecisionStore, StoreError};
use crate::domain::{AssetId, Decision, DecisionCounts};

/// SQLite implementation of the decision store.
pub struct SqliteDecisionStore {
    /// Wrapped in Mutex because rusqlite::Connection is not Sync.
    /// All operations run under spawn_blocking to keep the runtime free.
    conn: Arc<Mutex<Connection>>,
    /// Path to the database file (for error messages).
    path: PathBuf,
}

impl std::fmt::Debug for SqliteDecisionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDecisionStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteDecisionStore {
    /// Open or create a database at the given path.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let path = path.to_path_buf();
        let path_clone = path.clone();

        let conn = tokio::task::spawn_blocking(move || {
            if let Some(parent) = path_clone.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let conn = Connection::open(&path_clone).map_err(|e| StoreError::Open {
                path: path_clone.clone(),
                source: e,
            })?;

            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;

            schema::migrate(&conn)?;

            Ok::<_, StoreError>(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::Lock(e.to_string()))?;
            f(&guard)
        })
        .await?
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn decision_from_row(row: &Row<'_>) -> rusqlite::Result<Decision> {
    let id: String = row.get(0)?;
    let asset_id: String = row.get(1)?;
    let decided_at: String = row.get(2)?;
    let asset_created_at: String = row.get(3)?;
    let kept: bool = row.get(4)?;

    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Decision {
        id,
        asset_id: AssetId::new(asset_id),
        timestamp: parse_time(2, &decided_at)?,
        asset_created_at: parse_time(3, &asset_created_at)?,
        kept,
    })
}

#[async_trait]
impl DecisionStore for SqliteDecisionStore {
    async fn append(&self, decision: &Decision) -> Result<(), StoreError> {
        let decision = decision.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO decisions (id, asset_id, decided_at, asset_created_at, kept)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    decision.id.to_string(),
                    decision.asset_id.as_str(),
                    format_time(&decision.timestamp),
                    format_time(&decision.asset_created_at),
                    decision.kept,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn aggregate_counts(&self) -> Result<DecisionCounts, StoreError> {
        self.with_conn(|conn| {
            let (kept, deleted): (i64, i64) = conn.query_row(
                "SELECT
                    COALESCE(SUM(CASE WHEN kept = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN kept = 0 THEN 1 ELSE 0 END), 0)
                 FROM decisions",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(DecisionCounts {
                kept: kept as usize,
                deleted: deleted as usize,
            })
        })
        .await
    }

    async fn decided_ids(&self) -> Result<HashSet<AssetId>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT asset_id FROM decisions")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .map(|r| r.map(AssetId::new))
                .collect::<rusqlite::Result<HashSet<_>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Decision>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, asset_id, decided_at, asset_created_at, kept
                 FROM decisions ORDER BY seq DESC LIMIT ?1",
            )?;
            let decisions = stmt
                .query_map([limit], decision_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(decisions)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Asset, Direction};

    #[tokio::test]
    async fn test_empty_counts() {
        let store = SqliteDecisionStore::open_in_memory().unwrap();
        let counts = store.aggregate_counts().await.unwrap();
        assert_eq!(counts, DecisionCounts::default());
    }

    #[tokio::test]
    async fn test_recent_round_trips_timestamps() {
        let store = SqliteDecisionStore::open_in_memory().unwrap();
        let asset = Asset::new("IMG_0001", Utc::now());
        let decision = Decision::new(&asset, Direction::Delete);

        store.append(&decision).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent, vec![decision]);
    }

    #[tokio::test]
    async fn test_duplicate_record_id_is_rejected() {
        let store = SqliteDecisionStore::open_in_memory().unwrap();
        let asset = Asset::new("IMG_0001", Utc::now());
        let decision = Decision::new(&asset, Direction::Keep);

        store.append(&decision).await.unwrap();
        let result = store.append(&decision).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }
}
