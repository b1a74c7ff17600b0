//! Append-only value-change history.

use super::{GuardedSqlite, GuardedTransaction};
use crate::errors::RepositoryError;

/// Append-only audit log of field-level changes.
///
/// One row per non-empty diff; rows are never updated or deleted.
#[derive(Clone)]
pub struct SqliteHistoryRepository {
    db: GuardedSqlite,
}

impl SqliteHistoryRepository {
    pub fn new(db: GuardedSqlite) -> Self {
        Self { db }
    }

    /// Create the `change_history` table when missing.
    pub async fn ensure_table(&self) -> Result<(), RepositoryError> {
        self.db
            .execute(sqlx::query(
                "CREATE TABLE IF NOT EXISTS change_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    entity_type TEXT NOT NULL,
                    entity_key TEXT NOT NULL,
                    changed_at TEXT NOT NULL,
                    diff TEXT NOT NULL,
                    source TEXT NOT NULL
                )",
            ))
            .await?;
        Ok(())
    }

    /// Append one history row inside the current batch transaction.
    ///
    /// No-op when the encoded diff is empty.
    pub async fn append(
        &self,
        tx: &mut GuardedTransaction,
        entity_type: &str,
        entity_key: &str,
        diff_json: &str,
        source: &str,
        now: &str,
    ) -> Result<(), RepositoryError> {
        if diff_json.is_empty() || diff_json == "{}" {
            return Ok(());
        }
        tx.execute(
            sqlx::query(
                "INSERT INTO change_history (entity_type, entity_key, changed_at, diff, source)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(entity_type)
            .bind(entity_key)
            .bind(now)
            .bind(diff_json)
            .bind(source),
        )
        .await?;
        Ok(())
    }
}
