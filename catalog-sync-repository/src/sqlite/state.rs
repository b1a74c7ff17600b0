//! Durable sync progress state, one row per entity type.

use catalog_sync_shared::SyncState;
use chrono::{SecondsFormat, Utc};
use sqlx::Row;

use super::GuardedSqlite;
use crate::errors::RepositoryError;

/// SQLite-backed store for [`SyncState`] records.
///
/// State rows are created on first use and reset in place; they are never
/// deleted.
#[derive(Clone)]
pub struct SqliteStateRepository {
    db: GuardedSqlite,
}

impl SqliteStateRepository {
    pub fn new(db: GuardedSqlite) -> Self {
        Self { db }
    }

    /// Create the `sync_state` table when missing.
    pub async fn ensure_table(&self) -> Result<(), RepositoryError> {
        self.db
            .execute(sqlx::query(
                "CREATE TABLE IF NOT EXISTS sync_state (
                    type TEXT PRIMARY KEY,
                    last_key TEXT,
                    total_fetched INTEGER,
                    inserted INTEGER,
                    updated INTEGER,
                    unchanged INTEGER,
                    errors_count INTEGER,
                    batches INTEGER,
                    started_at TEXT,
                    updated_at TEXT,
                    done INTEGER
                )",
            ))
            .await?;
        Ok(())
    }

    /// Load the state for an entity type, or a fresh zeroed state when the
    /// row does not exist yet.
    pub async fn load(&self, entity: &str) -> Result<SyncState, RepositoryError> {
        let row = self
            .db
            .fetch_optional(
                sqlx::query("SELECT * FROM sync_state WHERE type = ? LIMIT 1").bind(entity),
            )
            .await?;

        let Some(row) = row else {
            return Ok(SyncState::empty());
        };

        Ok(SyncState {
            last_key: row.try_get::<Option<String>, _>("last_key")?.unwrap_or_default(),
            total_fetched: row.try_get::<Option<i64>, _>("total_fetched")?.unwrap_or(0),
            inserted: row.try_get::<Option<i64>, _>("inserted")?.unwrap_or(0),
            updated: row.try_get::<Option<i64>, _>("updated")?.unwrap_or(0),
            unchanged: row.try_get::<Option<i64>, _>("unchanged")?.unwrap_or(0),
            errors_count: row.try_get::<Option<i64>, _>("errors_count")?.unwrap_or(0),
            batches: row.try_get::<Option<i64>, _>("batches")?.unwrap_or(0),
            started_at: row.try_get("started_at")?,
            updated_at: row.try_get("updated_at")?,
            done: row.try_get::<Option<i64>, _>("done")?.unwrap_or(0) != 0,
        })
    }

    /// Reset the state for an entity type to zero and mark a new run start.
    pub async fn reset(&self, entity: &str) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.db
            .execute(
                sqlx::query(
                    "INSERT INTO sync_state (type, last_key, total_fetched, inserted, updated,
                         unchanged, errors_count, batches, started_at, updated_at, done)
                     VALUES (?, '', 0, 0, 0, 0, 0, 0, ?, ?, 0)
                     ON CONFLICT(type) DO UPDATE SET
                         last_key = '',
                         total_fetched = 0,
                         inserted = 0,
                         updated = 0,
                         unchanged = 0,
                         errors_count = 0,
                         batches = 0,
                         started_at = excluded.started_at,
                         updated_at = excluded.updated_at,
                         done = 0",
                )
                .bind(entity)
                .bind(now.as_str())
                .bind(now.as_str()),
            )
            .await?;
        Ok(())
    }

    /// Persist a state snapshot, stamping `updated_at`.
    pub async fn save(&self, entity: &str, state: &SyncState) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let started_at = state.started_at.clone().unwrap_or_else(|| now.clone());
        self.db
            .execute(
                sqlx::query(
                    "INSERT INTO sync_state (type, last_key, total_fetched, inserted, updated,
                         unchanged, errors_count, batches, started_at, updated_at, done)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(type) DO UPDATE SET
                         last_key = excluded.last_key,
                         total_fetched = excluded.total_fetched,
                         inserted = excluded.inserted,
                         updated = excluded.updated,
                         unchanged = excluded.unchanged,
                         errors_count = excluded.errors_count,
                         batches = excluded.batches,
                         updated_at = excluded.updated_at,
                         done = excluded.done",
                )
                .bind(entity)
                .bind(state.last_key.as_str())
                .bind(state.total_fetched)
                .bind(state.inserted)
                .bind(state.updated)
                .bind(state.unchanged)
                .bind(state.errors_count)
                .bind(state.batches)
                .bind(started_at.as_str())
                .bind(now.as_str())
                .bind(state.done as i64),
            )
            .await?;
        Ok(())
    }
}
