//! Destination table access for synced entities.
//!
//! Target tables are dynamic: the baseline holds the business key and the
//! bookkeeping columns, everything else is added by the schema reconciler
//! as the mapping evolves. All statements are built with quoted
//! identifiers and bound parameters and go through the dialect guard.

use catalog_sync_shared::{ComputedPaths, EntityMapping, FieldMap, FieldValue, HierarchyNode, TreeColumns};
use sqlx::Row;
use tracing::warn;

use super::{bind_value, decode_row, merge_reasons, quote_ident, GuardedSqlite, GuardedTransaction};
use crate::errors::RepositoryError;

/// SQLite-backed repository for one family of target tables.
#[derive(Clone)]
pub struct SqliteTargetRepository {
    db: GuardedSqlite,
}

impl SqliteTargetRepository {
    pub fn new(db: GuardedSqlite) -> Self {
        Self { db }
    }

    /// Create the baseline target table when missing.
    ///
    /// The baseline carries the business key and the bookkeeping columns;
    /// mapped source columns are reconciled in separately. Tree-shaped
    /// entities additionally get the derived path columns.
    pub async fn ensure_table(&self, mapping: &EntityMapping) -> Result<(), RepositoryError> {
        let key_type = mapping.column_type(&mapping.key_column);
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                {} {} UNIQUE,
                row_hash TEXT,
                last_seen_at TEXT,
                last_synced_at TEXT,
                changed INTEGER DEFAULT 0,
                changed_fields TEXT,
                change_reason TEXT",
            quote_ident(&mapping.target_table),
            quote_ident(&mapping.key_column),
            key_type
        );
        if mapping.tree.is_some() {
            sql.push_str(
                ",
                path TEXT,
                path_ids TEXT,
                seo_url TEXT",
            );
        }
        sql.push_str("\n            )");
        self.db.execute(sqlx::query(&sql)).await?;
        Ok(())
    }

    /// Look up the existing target record by business key.
    pub async fn find_by_key(
        &self,
        tx: &mut GuardedTransaction,
        mapping: &EntityMapping,
        key: &str,
    ) -> Result<Option<FieldMap>, RepositoryError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ? LIMIT 1",
            quote_ident(&mapping.target_table),
            quote_ident(&mapping.key_column)
        );
        let row = tx.fetch_optional(sqlx::query(&sql).bind(key)).await?;
        row.as_ref().map(decode_row).transpose()
    }

    /// Insert a new record with its initial hash and the `new` reason tag.
    pub async fn insert(
        &self,
        tx: &mut GuardedTransaction,
        mapping: &EntityMapping,
        fields: &FieldMap,
        row_hash: &str,
        now: &str,
    ) -> Result<(), RepositoryError> {
        let columns: Vec<&String> = fields.keys().collect();
        let mut column_sql: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let mut placeholders = vec!["?"; columns.len()];
        for meta in [
            "row_hash",
            "last_seen_at",
            "last_synced_at",
            "change_reason",
        ] {
            column_sql.push(meta.to_string());
            placeholders.push("?");
        }
        column_sql.push("changed".to_string());
        placeholders.push("1");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&mapping.target_table),
            column_sql.join(", "),
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for name in &columns {
            query = bind_value(query, &fields[*name]);
        }
        query = query.bind(row_hash).bind(now).bind(now).bind("new");
        tx.execute(query).await?;
        Ok(())
    }

    /// Advance the seen/synced timestamps without touching anything else.
    pub async fn touch_seen(
        &self,
        tx: &mut GuardedTransaction,
        mapping: &EntityMapping,
        key: &str,
        now: &str,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            "UPDATE {} SET last_seen_at = ?, last_synced_at = ? WHERE {} = ?",
            quote_ident(&mapping.target_table),
            quote_ident(&mapping.key_column)
        );
        tx.execute(sqlx::query(&sql).bind(now).bind(now).bind(key))
            .await?;
        Ok(())
    }

    /// Rewrite a changed record: all mapped fields, the new hash, the
    /// encoded diff, and the accumulated `fields` reason tag.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_row(
        &self,
        tx: &mut GuardedTransaction,
        mapping: &EntityMapping,
        key: &str,
        fields: &FieldMap,
        row_hash: &str,
        diff_json: &str,
        existing_reason: &str,
        now: &str,
    ) -> Result<(), RepositoryError> {
        let columns: Vec<&String> = fields
            .keys()
            .filter(|c| !c.eq_ignore_ascii_case(&mapping.key_column))
            .collect();
        let mut assignments: Vec<String> =
            columns.iter().map(|c| format!("{} = ?", quote_ident(c))).collect();
        assignments.extend(
            [
                "row_hash = ?",
                "last_seen_at = ?",
                "last_synced_at = ?",
                "changed = 1",
                "changed_fields = ?",
                "change_reason = ?",
            ]
            .map(String::from),
        );

        let reason = merge_reasons(existing_reason, &["fields"]);
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quote_ident(&mapping.target_table),
            assignments.join(", "),
            quote_ident(&mapping.key_column)
        );

        let mut query = sqlx::query(&sql);
        for name in &columns {
            query = bind_value(query, &fields[*name]);
        }
        query = query
            .bind(row_hash)
            .bind(now)
            .bind(now)
            .bind(diff_json)
            .bind(reason.as_str())
            .bind(key);
        tx.execute(query).await?;
        Ok(())
    }

    /// Load the full node set of a tree-shaped entity for path building.
    ///
    /// Rows without a usable integer key are skipped with a diagnostic;
    /// a stored parent of 0 is normalized to "root".
    pub async fn load_nodes(
        &self,
        mapping: &EntityMapping,
        tree: &TreeColumns,
    ) -> Result<Vec<HierarchyNode>, RepositoryError> {
        let sql = format!(
            "SELECT {}, {}, {}, path, path_ids, seo_url FROM {}",
            quote_ident(&mapping.key_column),
            quote_ident(&tree.name_column),
            quote_ident(&tree.parent_column),
            quote_ident(&mapping.target_table)
        );
        let rows = self.db.fetch_all(sqlx::query(&sql)).await?;

        let mut nodes = Vec::with_capacity(rows.len());
        for row in &rows {
            let fields = decode_row(row)?;
            let Some(id) = fields.get(&mapping.key_column).and_then(FieldValue::as_int) else {
                warn!(
                    table = %mapping.target_table,
                    "Skipping tree node without integer key"
                );
                continue;
            };
            let parent_id = fields
                .get(&tree.parent_column)
                .and_then(FieldValue::as_int)
                .filter(|p| *p != 0);
            nodes.push(HierarchyNode {
                id,
                name: fields
                    .get(&tree.name_column)
                    .map(FieldValue::as_text)
                    .unwrap_or_default(),
                parent_id,
                path: fields.get("path").map(FieldValue::as_text).unwrap_or_default(),
                path_ids: fields
                    .get("path_ids")
                    .map(FieldValue::as_text)
                    .unwrap_or_default(),
                seo_url: fields
                    .get("seo_url")
                    .map(FieldValue::as_text)
                    .unwrap_or_default(),
            });
        }
        Ok(nodes)
    }

    /// Write computed path fields for one node.
    ///
    /// Skipped entirely (returns `false`) when none of the three derived
    /// values changed, so unchanged nodes cause no write churn and no
    /// change-reason noise.
    pub async fn write_paths(
        &self,
        mapping: &EntityMapping,
        computed: &ComputedPaths,
    ) -> Result<bool, RepositoryError> {
        let select_sql = format!(
            "SELECT path, path_ids, seo_url, change_reason FROM {} WHERE {} = ? LIMIT 1",
            quote_ident(&mapping.target_table),
            quote_ident(&mapping.key_column)
        );
        let Some(row) = self
            .db
            .fetch_optional(sqlx::query(&select_sql).bind(computed.id))
            .await?
        else {
            return Ok(false);
        };

        let current_path: String = row.try_get::<Option<String>, _>("path")?.unwrap_or_default();
        let current_ids: String = row
            .try_get::<Option<String>, _>("path_ids")?
            .unwrap_or_default();
        let current_seo: String = row
            .try_get::<Option<String>, _>("seo_url")?
            .unwrap_or_default();
        if current_path == computed.path
            && current_ids == computed.path_ids
            && current_seo == computed.seo_url
        {
            return Ok(false);
        }

        let existing_reason: String = row
            .try_get::<Option<String>, _>("change_reason")?
            .unwrap_or_default();
        let reason = merge_reasons(&existing_reason, &["path"]);

        let update_sql = format!(
            "UPDATE {} SET path = ?, path_ids = ?, seo_url = ?, changed = 1, change_reason = ?
             WHERE {} = ?",
            quote_ident(&mapping.target_table),
            quote_ident(&mapping.key_column)
        );
        self.db
            .execute(
                sqlx::query(&update_sql)
                    .bind(computed.path.as_str())
                    .bind(computed.path_ids.as_str())
                    .bind(computed.seo_url.as_str())
                    .bind(reason.as_str())
                    .bind(computed.id),
            )
            .await?;
        Ok(true)
    }
}
