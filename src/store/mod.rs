//! Durable, append-only decision storage.
//!
//! Two backends are provided:
//! - `JsonlDecisionStore`: one JSON object per line, easy to inspect
//! - `SqliteDecisionStore`: a single `decisions` table
//!
//! Stores are written from exactly one task (see `DecisionRecorder`), but
//! each backend still guards its own writes so two processes sharing a
//! file cannot interleave partial records.

pub mod jsonl;
pub mod schema;
pub mod sqlite;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AssetId, Decision, DecisionCounts};

pub use jsonl::JsonlDecisionStore;
pub use sqlite::SqliteDecisionStore;

/// Errors that can occur in a decision store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record at line {line}: {source}")]
    Corrupt {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: i32, expected: i32 },

    #[error("Failed to acquire store lock: {0}")]
    Lock(String),

    #[error("Failed to spawn blocking task: {0}")]
    Spawn(#[from] tokio::task::JoinError),
}

/// Trait for append-only decision stores
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Persist one decision
    async fn append(&self, decision: &Decision) -> Result<(), StoreError>;

    /// Count kept and deleted decisions
    async fn aggregate_counts(&self) -> Result<DecisionCounts, StoreError>;

    /// Ids of every asset that has a decision
    async fn decided_ids(&self) -> Result<HashSet<AssetId>, StoreError>;

    /// Most recent decisions, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<Decision>, StoreError>;
}

/// Which store implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// decisions.jsonl
    #[default]
    Jsonl,

    /// decisions.db
    Sqlite,
}

impl StoreBackend {
    /// File name of the store inside the sortify home directory
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Jsonl => "decisions.jsonl",
            Self::Sqlite => "decisions.db",
        }
    }
}

/// Open the configured store inside `home`
pub async fn open_store(
    backend: StoreBackend,
    home: &Path,
) -> Result<Arc<dyn DecisionStore>, StoreError> {
    let path = home.join(backend.file_name());
    let store: Arc<dyn DecisionStore> = match backend {
        StoreBackend::Jsonl => Arc::new(JsonlDecisionStore::open(path).await?),
        StoreBackend::Sqlite => Arc::new(SqliteDecisionStore::open(&path).await?),
    };
    Ok(store)
}
