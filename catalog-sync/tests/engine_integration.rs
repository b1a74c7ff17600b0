//! Integration tests for the cursor batch sync engine and the runner,
//! driven by an in-memory mock source.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use catalog_sync::engine::SyncEngine;
use catalog_sync::mappings::{DefaultMappings, MappingProvider};
use catalog_sync::runner::{RunOptions, SyncRunner};
use catalog_sync_repository::{CatalogSource, GuardedSqlite, SourceError};
use catalog_sync_shared::{EntityMapping, FieldMap, FieldValue};
use sqlx::{Row, SqlitePool};

/// Source serving rows from memory with proper keyset pagination.
struct MockSource {
    rows: RwLock<Vec<FieldMap>>,
}

impl MockSource {
    fn new(rows: Vec<FieldMap>) -> Self {
        Self { rows: RwLock::new(rows) }
    }

    fn replace(&self, rows: Vec<FieldMap>) {
        *self.rows.write().unwrap() = rows;
    }
}

#[async_trait]
impl CatalogSource for MockSource {
    async fn fetch_page(
        &self,
        mapping: &EntityMapping,
        after_key: &str,
        limit: i64,
    ) -> Result<Vec<FieldMap>, SourceError> {
        let key = |row: &FieldMap| {
            row.get(&mapping.key_column)
                .map(FieldValue::as_text)
                .unwrap_or_default()
        };
        let mut rows: Vec<FieldMap> = self.rows.read().unwrap().clone();
        rows.sort_by_key(|row| key(row));
        Ok(rows
            .into_iter()
            .filter(|row| after_key.is_empty() || key(row).as_str() > after_key)
            .take(limit as usize)
            // Project to the mapped columns, like a real SELECT would.
            .map(|row| {
                row.into_iter()
                    .filter(|(column, _)| {
                        column == &mapping.key_column || mapping.select.contains(column)
                    })
                    .collect()
            })
            .collect())
    }
}

fn items_mapping() -> EntityMapping {
    EntityMapping {
        entity: "items".into(),
        source_table: "erp_items".into(),
        key_column: "item_no".into(),
        filter: None,
        select: vec!["item_no".into(), "name".into(), "stock".into()],
        numeric_int: vec!["stock".into()],
        numeric_real: vec![],
        tracked: vec!["name".into(), "stock".into()],
        target_table: "items".into(),
        tree: None,
    }
}

fn item(no: &str, name: &str, stock: i64) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("item_no".into(), no.into());
    fields.insert("name".into(), name.into());
    fields.insert("stock".into(), FieldValue::Int(stock));
    fields
}

fn category(id: i64, name: &str, parent: i64) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("category_id".into(), FieldValue::Int(id));
    fields.insert("name".into(), name.into());
    fields.insert("parent_id".into(), FieldValue::Int(parent));
    fields.insert("sort_order".into(), FieldValue::Int(0));
    fields
}

fn engine_with(pool: SqlitePool, rows: Vec<FieldMap>) -> (SyncEngine, Arc<MockSource>) {
    let source = Arc::new(MockSource::new(rows));
    let db = GuardedSqlite::new(pool, "engine-test");
    (SyncEngine::new(source.clone(), db), source)
}

#[sqlx::test]
async fn resume_tokens_walk_the_key_order(pool: SqlitePool) {
    let rows = vec![item("A1", "One", 1), item("A2", "Two", 2), item("A3", "Three", 3)];
    let (engine, _) = engine_with(pool, rows);
    let mapping = items_mapping();

    let first = engine.process_batch(&mapping, "", 2).await.unwrap();
    assert_eq!(first.batch_fetched, 2);
    assert_eq!(first.last_key, "A2");
    assert!(!first.done);
    assert_eq!(first.inserted, 2);

    let second = engine.process_batch(&mapping, "A2", 2).await.unwrap();
    assert_eq!(second.batch_fetched, 1);
    assert_eq!(second.last_key, "A3");
    assert!(!second.done);
    assert_eq!(second.total_fetched, 3);

    let third = engine.process_batch(&mapping, "A3", 2).await.unwrap();
    assert_eq!(third.batch_fetched, 0);
    assert!(third.done);
    assert_eq!(third.inserted, 3);
    assert_eq!(third.batches, 2);
}

#[sqlx::test]
async fn second_full_run_is_all_unchanged(pool: SqlitePool) {
    let rows = vec![item("A1", "One", 1), item("A2", "Two", 2), item("A3", "Three", 3)];
    let (engine, _) = engine_with(pool, rows);
    let mapping = items_mapping();

    let mut token = String::new();
    loop {
        let report = engine.process_batch(&mapping, &token, 2).await.unwrap();
        if report.done {
            break;
        }
        token = report.last_key;
    }

    // Fresh empty token resets the state and replays the whole key range.
    let mut token = String::new();
    let final_report = loop {
        let report = engine.process_batch(&mapping, &token, 2).await.unwrap();
        if report.done {
            break report;
        }
        token = report.last_key;
    };
    assert_eq!(final_report.inserted, 0);
    assert_eq!(final_report.updated, 0);
    assert_eq!(final_report.unchanged, final_report.total_fetched);
    assert_eq!(final_report.total_fetched, 3);
}

#[sqlx::test]
async fn changed_rows_are_updated_with_history(pool: SqlitePool) {
    let rows = vec![item("A1", "Lamp", 3)];
    let (engine, source) = engine_with(pool.clone(), rows);
    let mapping = items_mapping();

    let report = engine.process_batch(&mapping, "", 10).await.unwrap();
    assert_eq!(report.inserted, 1);

    source.replace(vec![item("A1", "Desk lamp", 3)]);
    let report = engine.process_batch(&mapping, "", 10).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.inserted, 0);

    let row = sqlx::query("SELECT name, changed, changed_fields, change_reason FROM items WHERE item_no = 'A1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("name"), "Desk lamp");
    assert_eq!(row.get::<i64, _>("changed"), 1);
    assert!(row.get::<String, _>("changed_fields").contains("Desk lamp"));
    assert_eq!(row.get::<String, _>("change_reason"), "new,fields");

    let history = sqlx::query(
        "SELECT COUNT(*) AS n FROM change_history WHERE entity_type = 'items' AND entity_key = 'A1'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(history.get::<i64, _>("n"), 1);
}

#[sqlx::test]
async fn padded_keys_are_trimmed_before_storage(pool: SqlitePool) {
    // CHAR-typed ERP keys arrive with whitespace padding; the stored key
    // must be the trimmed form so the second run finds the row again.
    let rows = vec![item(" A1 ", "Lamp", 3)];
    let (engine, _) = engine_with(pool.clone(), rows);
    let mapping = items_mapping();

    let first = engine.process_batch(&mapping, "", 10).await.unwrap();
    assert_eq!(first.inserted, 1);
    assert_eq!(first.last_key, "A1");

    let row = sqlx::query("SELECT item_no FROM items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("item_no"), "A1");

    let second = engine.process_batch(&mapping, "", 10).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 1);
}

#[sqlx::test]
async fn legacy_rows_without_hash_are_refreshed(pool: SqlitePool) {
    let rows = vec![item("A1", "Lamp", 3)];
    let (engine, _) = engine_with(pool.clone(), rows);
    let mapping = items_mapping();

    engine.process_batch(&mapping, "", 10).await.unwrap();
    // Rows that predate the hash column carry no fingerprint.
    sqlx::query("UPDATE items SET row_hash = '' WHERE item_no = 'A1'")
        .execute(&pool)
        .await
        .unwrap();

    let report = engine.process_batch(&mapping, "", 10).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.unchanged, 0);

    let row = sqlx::query("SELECT row_hash FROM items WHERE item_no = 'A1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!row.get::<String, _>("row_hash").is_empty());
}

#[sqlx::test]
async fn blank_keys_are_counted_not_fatal(pool: SqlitePool) {
    let rows = vec![item("", "Ghost", 0), item("A1", "One", 1)];
    let (engine, _) = engine_with(pool, rows);
    let mapping = items_mapping();

    let report = engine.process_batch(&mapping, "", 10).await.unwrap();
    assert_eq!(report.batch_fetched, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.errors_count, 1);
}

#[sqlx::test]
async fn new_mapping_column_triggers_one_additive_operation(pool: SqlitePool) {
    let rows = vec![item("A1", "One", 1)];
    let (engine, source) = engine_with(pool.clone(), rows);
    let mut mapping = items_mapping();
    mapping.select = vec!["item_no".into(), "name".into()];

    engine.process_batch(&mapping, "", 10).await.unwrap();
    let before = sqlx::query("SELECT COUNT(*) AS n FROM schema_change_log WHERE column_name = 'stock'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(before.get::<i64, _>("n"), 0);

    // The mapping grows one column; the next call reconciles it exactly once.
    mapping.select.push("stock".into());
    source.replace(vec![item("A1", "One", 1)]);
    engine.process_batch(&mapping, "", 10).await.unwrap();
    engine.process_batch(&mapping, "", 10).await.unwrap();

    let after = sqlx::query("SELECT COUNT(*) AS n FROM schema_change_log WHERE column_name = 'stock'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(after.get::<i64, _>("n"), 1);
}

#[sqlx::test]
async fn runner_syncs_and_builds_category_paths(pool: SqlitePool) {
    let rows = vec![
        category(1, "Root", 0),
        category(2, "Child", 1),
        category(3, "Grandchild", 2),
    ];
    let source = Arc::new(MockSource::new(rows));
    let db = GuardedSqlite::new(pool.clone(), "runner-test");
    let engine = SyncEngine::new(source, db);
    let runner = SyncRunner::new(engine, Arc::new(DefaultMappings::new()));

    let report = runner
        .run_entity("categories", &RunOptions::default())
        .await
        .unwrap();
    assert!(report.done);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.paths_updated, 3);
    assert!(!report.budget_exhausted);

    let row = sqlx::query("SELECT path, path_ids, seo_url FROM categories WHERE category_id = 3")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("path"), "Root/Child/Grandchild");
    assert_eq!(row.get::<String, _>("path_ids"), "1/2/3");
    assert_eq!(row.get::<String, _>("seo_url"), "de/root/child/grandchild");

    // A second run changes nothing and rewrites no paths.
    let again = runner
        .run_entity("categories", &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.unchanged, 3);
    assert_eq!(again.paths_updated, 0);
}

#[sqlx::test]
async fn unknown_entity_is_rejected(pool: SqlitePool) {
    let source = Arc::new(MockSource::new(vec![]));
    let db = GuardedSqlite::new(pool, "runner-test");
    let runner = SyncRunner::new(SyncEngine::new(source, db), Arc::new(DefaultMappings::new()));

    let err = runner
        .run_entity("orders", &RunOptions::default())
        .await
        .expect_err("unknown entity");
    assert!(err.to_string().contains("orders"));
}
