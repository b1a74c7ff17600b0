//! Cursor batch sync engine.
//!
//! Pages through a source entity with keyset pagination, classifies each
//! row as new / changed / unchanged via a canonical content hash, and
//! upserts through the dialect-guarded destination inside one
//! all-or-nothing transaction per batch. The engine holds no in-memory
//! state across calls; everything needed to resume lives in the durable
//! `sync_state` row, so every invocation is an independently retryable
//! unit.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use catalog_sync_repository::{
    CatalogSource, DesiredColumn, GuardedSqlite, GuardedTransaction, SchemaReconciler,
    SqliteHistoryRepository, SqliteStateRepository, SqliteTargetRepository,
};
use catalog_sync_shared::hash::is_legacy_hash;
use catalog_sync_shared::{build_diff, encode_diff, row_hash, BatchReport, EntityMapping, FieldMap, FieldValue};

use crate::errors::SyncError;

/// Batch size bounds; caller-supplied sizes are clamped into this range.
pub const MAX_BATCH_SIZE: i64 = 1000;

/// Source tag written to the change history.
const HISTORY_SOURCE_TAG: &str = "batch_sync";

/// Typed per-row result. Validation failures become `Skipped`; anything
/// infrastructure-level propagates as a fatal [`SyncError`] instead.
enum RowOutcome {
    Inserted,
    Updated,
    Unchanged,
    Skipped,
}

/// Counters for one batch, before they are folded into the durable state.
struct BatchStats {
    batch_fetched: i64,
    inserted: i64,
    updated: i64,
    unchanged: i64,
    errors_count: i64,
    last_key: String,
}

/// The cursor batch sync engine.
pub struct SyncEngine {
    source: Arc<dyn CatalogSource>,
    db: GuardedSqlite,
    targets: SqliteTargetRepository,
    states: SqliteStateRepository,
    history: SqliteHistoryRepository,
    reconciler: SchemaReconciler,
}

impl SyncEngine {
    /// Build an engine over an explicit source and guarded destination.
    pub fn new(source: Arc<dyn CatalogSource>, db: GuardedSqlite) -> Self {
        Self {
            targets: SqliteTargetRepository::new(db.clone()),
            states: SqliteStateRepository::new(db.clone()),
            history: SqliteHistoryRepository::new(db.clone()),
            reconciler: SchemaReconciler::new(db.clone()),
            source,
            db,
        }
    }

    /// Destination target repository, shared with the hierarchy pass.
    pub fn targets(&self) -> &SqliteTargetRepository {
        &self.targets
    }

    /// Durable state repository.
    pub fn states(&self) -> &SqliteStateRepository {
        &self.states
    }

    /// Process one batch for an entity type.
    ///
    /// `after_key` is the resume token: the last business key seen, empty
    /// meaning "start over" (which also resets the durable state).
    /// Returns the flat batch result including the advanced token; call
    /// again with that token until `done`.
    pub async fn process_batch(
        &self,
        mapping: &EntityMapping,
        after_key: &str,
        batch_size: i64,
    ) -> Result<BatchReport, SyncError> {
        let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);

        self.states.ensure_table().await?;
        self.history.ensure_table().await?;
        self.targets.ensure_table(mapping).await?;

        if after_key.is_empty() {
            self.states.reset(&mapping.entity).await?;
        }

        self.reconciler
            .ensure_columns(&mapping.target_table, &desired_columns(mapping, &[]))
            .await?;

        let rows = self.source.fetch_page(mapping, after_key, batch_size).await?;

        // The page may carry columns the mapping does not name yet; they
        // are reconciled in before any row is written.
        let drifted = desired_columns(mapping, &rows);
        self.reconciler
            .ensure_columns(&mapping.target_table, &drifted)
            .await?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut stats = BatchStats {
            batch_fetched: rows.len() as i64,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            errors_count: 0,
            last_key: after_key.to_string(),
        };

        if !rows.is_empty() {
            let mut tx = self.db.begin().await?;
            for row in &rows {
                match self.process_row(&mut tx, mapping, row, &now).await? {
                    RowOutcome::Inserted => stats.inserted += 1,
                    RowOutcome::Updated => stats.updated += 1,
                    RowOutcome::Unchanged => stats.unchanged += 1,
                    RowOutcome::Skipped => stats.errors_count += 1,
                }
            }
            if let Some(last) = rows.last() {
                let last_key = last
                    .get(&mapping.key_column)
                    .map(FieldValue::as_text)
                    .unwrap_or_default();
                let last_key = last_key.trim();
                if !last_key.is_empty() {
                    stats.last_key = last_key.to_string();
                }
            }
            tx.commit().await?;
        }

        let report = self.persist_progress(mapping, batch_size, &stats).await?;
        info!(
            entity = %mapping.entity,
            batch_fetched = report.batch_fetched,
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            errors_count = report.errors_count,
            last_key = %report.last_key,
            done = report.done,
            "Processed sync batch"
        );
        Ok(report)
    }

    /// Classify and write one source row inside the batch transaction.
    async fn process_row(
        &self,
        tx: &mut GuardedTransaction,
        mapping: &EntityMapping,
        row: &FieldMap,
        now: &str,
    ) -> Result<RowOutcome, SyncError> {
        let raw_key = match row.get(&mapping.key_column) {
            Some(value) if !value.is_blank() => value.as_text(),
            _ => {
                warn!(
                    entity = %mapping.entity,
                    key_column = %mapping.key_column,
                    "Skipping source row without business key"
                );
                return Ok(RowOutcome::Skipped);
            }
        };

        // ERP CHAR columns pad keys with whitespace. The trimmed key is
        // what gets stored and looked up, so identical source content
        // always lands on the same destination row.
        let key = raw_key.trim().to_string();
        let normalized;
        let row = if key != raw_key {
            let mut fields = row.clone();
            fields.insert(mapping.key_column.clone(), FieldValue::Text(key.clone()));
            normalized = fields;
            &normalized
        } else {
            row
        };

        let hash = row_hash(row);
        let existing = self.targets.find_by_key(tx, mapping, &key).await?;

        let Some(existing) = existing else {
            self.targets.insert(tx, mapping, row, &hash, now).await?;
            debug!(entity = %mapping.entity, key = %key, "Inserted new record");
            return Ok(RowOutcome::Inserted);
        };

        let stored_hash = existing
            .get("row_hash")
            .cloned()
            .unwrap_or(FieldValue::Null);
        // Legacy rows that predate the hash column are treated as changed:
        // a missing fingerprint cannot prove "no real change".
        if !is_legacy_hash(&stored_hash) && stored_hash.as_text() == hash {
            self.targets.touch_seen(tx, mapping, &key, now).await?;
            return Ok(RowOutcome::Unchanged);
        }

        let diff = build_diff(Some(&existing), row, mapping.tracked_fields());
        let diff_json = encode_diff(&diff);
        let existing_reason = existing
            .get("change_reason")
            .map(FieldValue::as_text)
            .unwrap_or_default();
        self.targets
            .update_row(
                tx,
                mapping,
                &key,
                row,
                &hash,
                &diff_json,
                &existing_reason,
                now,
            )
            .await?;
        if !diff.is_empty() {
            self.history
                .append(tx, &mapping.entity, &key, &diff_json, HISTORY_SOURCE_TAG, now)
                .await?;
        }
        debug!(entity = %mapping.entity, key = %key, changed_fields = diff.len(), "Updated record");
        Ok(RowOutcome::Updated)
    }

    /// Fold batch counters into the durable state and build the report.
    async fn persist_progress(
        &self,
        mapping: &EntityMapping,
        batch_size: i64,
        stats: &BatchStats,
    ) -> Result<BatchReport, SyncError> {
        let mut state = self.states.load(&mapping.entity).await?;

        state.total_fetched += stats.batch_fetched;
        state.inserted += stats.inserted;
        state.updated += stats.updated;
        state.unchanged += stats.unchanged;
        state.errors_count += stats.errors_count;
        if stats.batch_fetched > 0 {
            state.batches += 1;
        } else {
            state.done = true;
        }
        if !stats.last_key.is_empty() {
            state.last_key = stats.last_key.clone();
        }

        self.states.save(&mapping.entity, &state).await?;

        Ok(BatchReport {
            done: state.done,
            batch_size,
            batch_fetched: stats.batch_fetched,
            total_fetched: state.total_fetched,
            inserted: state.inserted,
            updated: state.updated,
            unchanged: state.unchanged,
            errors_count: state.errors_count,
            batches: state.batches,
            last_key: state.last_key,
        })
    }
}

/// Destination columns required by the mapping plus any columns the
/// fetched page introduced, typed through the mapping's numeric allowlists.
fn desired_columns(mapping: &EntityMapping, rows: &[FieldMap]) -> Vec<DesiredColumn> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut desired = Vec::new();
    for column in &mapping.select {
        if seen.insert(column.to_ascii_lowercase()) {
            desired.push(DesiredColumn::new(column.clone(), mapping.column_type(column)));
        }
    }
    for row in rows {
        for column in row.keys() {
            if seen.insert(column.to_ascii_lowercase()) {
                desired.push(DesiredColumn::new(column.clone(), mapping.column_type(column)));
            }
        }
    }
    desired
}
