use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use super::{SnapshotError, SnapshotStore, StoredSnapshot};

/// Process-local snapshot storage; contents vanish on restart.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    entries: Arc<DashMap<String, StoredSnapshot>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn insert_if_absent(
        &self,
        code: &str,
        data: &Value,
        created_at: DateTime<Utc>,
    ) -> Result<bool, SnapshotError> {
        match self.entries.entry(code.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(StoredSnapshot {
                    data: data.clone(),
                    created_at,
                });
                Ok(true)
            }
        }
    }

    async fn get(&self, code: &str) -> Result<Option<StoredSnapshot>, SnapshotError> {
        Ok(self.entries.get(code).map(|entry| entry.clone()))
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, SnapshotError> {
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.created_at >= cutoff);
        Ok(u64::try_from(before.saturating_sub(self.entries.len())).unwrap_or(u64::MAX))
    }
}
