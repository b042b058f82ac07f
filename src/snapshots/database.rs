use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, SqlErr,
};
use serde_json::Value;

use super::{SnapshotError, SnapshotStore, StoredSnapshot};
use crate::entities::snapshot;

/// Snapshot storage backed by the `snapshot` table.
#[derive(Debug, Clone)]
pub struct DatabaseSnapshotStore {
    db: DatabaseConnection,
}

impl DatabaseSnapshotStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SnapshotStore for DatabaseSnapshotStore {
    async fn insert_if_absent(
        &self,
        code: &str,
        data: &Value,
        created_at: DateTime<Utc>,
    ) -> Result<bool, SnapshotError> {
        let row = snapshot::ActiveModel {
            code: Set(code.to_string()),
            data: Set(serde_json::to_string(data)?),
            created_at: Set(created_at.fixed_offset()),
        };

        match row.insert(&self.db).await {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, code: &str) -> Result<Option<StoredSnapshot>, SnapshotError> {
        let Some(row) = snapshot::Entity::find_by_id(code.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        Ok(Some(StoredSnapshot {
            data: serde_json::from_str(&row.data)?,
            created_at: row.created_at.with_timezone(&Utc),
        }))
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, SnapshotError> {
        let result = snapshot::Entity::delete_many()
            .filter(snapshot::Column::CreatedAt.lt(cutoff.fixed_offset()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
