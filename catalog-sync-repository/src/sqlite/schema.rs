//! Additive schema reconciliation for the destination tables.
//!
//! The source's column set drifts over time; the destination only ever
//! grows. The diff itself is a pure function over two column lists so it
//! can be unit-tested without a live store; applying it issues one
//! `ALTER TABLE .. ADD COLUMN` per missing column through the guarded
//! handle and records every addition in an append-only audit table.

use chrono::{SecondsFormat, Utc};
use tracing::info;

use super::{quote_ident, GuardedSqlite};
use crate::errors::RepositoryError;

/// A column the active field mapping requires on the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredColumn {
    pub name: String,
    /// Conservative SQLite type: INTEGER / REAL for allowlisted numeric
    /// columns, TEXT for everything else.
    pub sql_type: &'static str,
}

impl DesiredColumn {
    pub fn new(name: impl Into<String>, sql_type: &'static str) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// Columns present in the requirement but absent from the destination,
/// compared case-insensitively. Never reports drops, renames or retypes.
pub fn missing_columns<'a>(
    existing: &[String],
    desired: &'a [DesiredColumn],
) -> Vec<&'a DesiredColumn> {
    desired
        .iter()
        .filter(|col| !existing.iter().any(|e| e.eq_ignore_ascii_case(&col.name)))
        .collect()
}

/// Applies additive schema changes to the guarded destination.
pub struct SchemaReconciler {
    db: GuardedSqlite,
}

impl SchemaReconciler {
    pub fn new(db: GuardedSqlite) -> Self {
        Self { db }
    }

    /// Ensure every desired column exists on `table`.
    ///
    /// Idempotent: a second call with the same requirement set performs
    /// zero writes. Returns the number of columns added. A failed addition
    /// is fatal (no partial writes against an incomplete schema).
    pub async fn ensure_columns(
        &self,
        table: &str,
        desired: &[DesiredColumn],
    ) -> Result<usize, RepositoryError> {
        let existing = self.table_columns(table).await?;
        let missing = missing_columns(&existing, desired);
        if missing.is_empty() {
            return Ok(0);
        }

        for column in &missing {
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                quote_ident(table),
                quote_ident(&column.name),
                column.sql_type
            );
            self.db
                .execute(sqlx::query(&sql))
                .await
                .map_err(|err| match err {
                    RepositoryError::Database(source) => RepositoryError::Schema {
                        table: table.to_string(),
                        column: column.name.clone(),
                        source,
                    },
                    other => other,
                })?;
            info!(
                table = table,
                column = %column.name,
                sql_type = column.sql_type,
                "Added destination column"
            );
        }

        self.record_additions(table, &missing).await?;
        Ok(missing.len())
    }

    /// Live column set of a destination table.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>, RepositoryError> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let rows = self.db.fetch_all(sqlx::query(&sql)).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = sqlx::Row::try_get(&row, "name")?;
            if !name.is_empty() {
                columns.push(name);
            }
        }
        Ok(columns)
    }

    /// Append one audit row per added column.
    async fn record_additions(
        &self,
        table: &str,
        added: &[&DesiredColumn],
    ) -> Result<(), RepositoryError> {
        self.db
            .execute(sqlx::query(
                "CREATE TABLE IF NOT EXISTS schema_change_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    table_name TEXT NOT NULL,
                    column_name TEXT NOT NULL,
                    added_at TEXT NOT NULL
                )",
            ))
            .await?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        for column in added {
            self.db
                .execute(
                    sqlx::query(
                        "INSERT INTO schema_change_log (table_name, column_name, added_at)
                         VALUES (?, ?, ?)",
                    )
                    .bind(table)
                    .bind(column.name.as_str())
                    .bind(now.as_str()),
                )
                .await?;
        }
        Ok(())
    }
}
