//! Short-code snapshot store behind the board's join links.
//!
//! `POST /api/snapshots` parks an arbitrary JSON document under a fresh 4-character code;
//! `GET /api/snapshots/{code}` returns it until the TTL lapses. Storage is in memory unless
//! a database is configured.

mod code;
mod database;
mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;

pub use code::{
    SNAPSHOT_CODE_LENGTH, generate_snapshot_code, is_valid_snapshot_code, normalize_snapshot_code,
};
pub use database::DatabaseSnapshotStore;
pub use memory::MemorySnapshotStore;

/// Attempts at finding an unused code before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 10;

/// How often expired snapshots are purged.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Snapshot store errors.
#[derive(Debug)]
pub enum SnapshotError {
    /// No live snapshot under this code
    NotFound(String),
    /// Every generated code collided
    CodeSpaceExhausted,
    /// Storage backend failure
    Backend(anyhow::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(code) => write!(f, "Snapshot not found: {code}"),
            Self::CodeSpaceExhausted => write!(
                f,
                "No free snapshot code after {MAX_CODE_ATTEMPTS} attempts"
            ),
            Self::Backend(err) => write!(f, "Snapshot backend error: {err:#}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<sea_orm::DbErr> for SnapshotError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Backend(err.into())
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend(err.into())
    }
}

/// A stored document and when it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// Storage backend for snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync + fmt::Debug {
    /// Store `data` under `code` unless the code is taken. Returns whether it was stored.
    async fn insert_if_absent(
        &self,
        code: &str,
        data: &Value,
        created_at: DateTime<Utc>,
    ) -> Result<bool, SnapshotError>;

    async fn get(&self, code: &str) -> Result<Option<StoredSnapshot>, SnapshotError>;

    /// Delete everything stored before `cutoff`. Returns the number of rows removed.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, SnapshotError>;
}

/// Code allocation and TTL policy on top of a [`SnapshotStore`].
#[derive(Debug, Clone)]
pub struct Snapshots {
    store: Arc<dyn SnapshotStore>,
    ttl: Duration,
}

impl Snapshots {
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// In-memory store with the given TTL.
    #[must_use]
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemorySnapshotStore::new()), ttl)
    }

    /// Store `data` and return its new code.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::CodeSpaceExhausted`] after [`MAX_CODE_ATTEMPTS`] collisions,
    /// or a backend error.
    pub async fn create(&self, data: &Value) -> Result<String, SnapshotError> {
        self.create_with(data, generate_snapshot_code).await
    }

    async fn create_with(
        &self,
        data: &Value,
        mut next_code: impl FnMut() -> String,
    ) -> Result<String, SnapshotError> {
        let now = Utc::now();
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = next_code();
            if self.store.insert_if_absent(&code, data, now).await? {
                tracing::debug!(%code, attempt, "Snapshot stored");
                return Ok(code);
            }
            tracing::debug!(%code, attempt, "Snapshot code collision");
        }

        Err(SnapshotError::CodeSpaceExhausted)
    }

    /// Fetch the data stored under `code` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NotFound`] for unknown, malformed or expired codes.
    pub async fn fetch(&self, code: &str) -> Result<Value, SnapshotError> {
        let code = normalize_snapshot_code(code);
        if !is_valid_snapshot_code(&code) {
            return Err(SnapshotError::NotFound(code));
        }

        match self.store.get(&code).await? {
            Some(stored) if !self.is_expired(&stored, Utc::now()) => Ok(stored.data),
            _ => Err(SnapshotError::NotFound(code)),
        }
    }

    /// Purge expired snapshots. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the purge fails.
    pub async fn sweep(&self) -> Result<u64, SnapshotError> {
        self.store.purge_older_than(self.cutoff(Utc::now())).await
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn is_expired(&self, stored: &StoredSnapshot, now: DateTime<Utc>) -> bool {
        stored.created_at < self.cutoff(now)
    }

    /// Spawn a background task purging expired snapshots every `every`.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let snapshots = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match snapshots.sweep().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "Expired snapshots purged"),
                    Err(err) => tracing::warn!("Snapshot sweep failed: {err}"),
                }
            }
        })
    }
}
