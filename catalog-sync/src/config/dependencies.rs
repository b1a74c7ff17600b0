//! Dependency initialization and wiring for the catalog sync.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use catalog_sync_repository::{AnySource, GuardedSqlite};

use crate::engine::SyncEngine;
use crate::mappings::DefaultMappings;
use crate::runner::{RunOptions, SyncRunner};
use crate::CatalogSyncError;

/// Default embedded cache database.
const DEFAULT_CACHE_DATABASE_URL: &str = "sqlite://storefront.db";

/// Default batch size for the sync loop.
const DEFAULT_BATCH_SIZE: i64 = 200;

/// Component name reported in dialect guard diagnostics.
const COMPONENT: &str = "catalog-sync";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured runner ready to sync.
    pub runner: SyncRunner,
    /// Run options assembled from the environment.
    pub options: RunOptions,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SOURCE_DATABASE_URL`: ERP source connection URL (required)
    /// - `CACHE_DATABASE_URL`: embedded cache URL (default: sqlite://storefront.db)
    /// - `SYNC_BATCH_SIZE`: rows per batch (default: 200)
    /// - `SYNC_BUDGET_SECS`: wall-clock budget for one run (default: unbounded)
    /// - `SYNC_RESUME`: "true" to resume from the stored token instead of
    ///   a full rebuild (default: false)
    pub async fn new() -> Result<Self, CatalogSyncError> {
        let source_url = env::var("SOURCE_DATABASE_URL")
            .map_err(|_| CatalogSyncError::config("SOURCE_DATABASE_URL is not set"))?;
        let cache_url = env::var("CACHE_DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_CACHE_DATABASE_URL.to_string());
        let batch_size = env::var("SYNC_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_BATCH_SIZE);
        let budget = env::var("SYNC_BUDGET_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        let resume = env::var("SYNC_RESUME")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        info!(
            cache_url = %cache_url,
            batch_size,
            budget_secs = budget.map(|b| b.as_secs()),
            resume,
            "Initializing dependencies"
        );

        let source = AnySource::connect(&source_url)
            .await
            .map_err(|e| CatalogSyncError::config(format!("Failed to connect to source: {}", e)))?;

        let cache_options = SqliteConnectOptions::from_str(&cache_url)
            .map_err(|e| CatalogSyncError::config(format!("Invalid CACHE_DATABASE_URL: {}", e)))?
            .create_if_missing(true);
        let cache_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(cache_options)
            .await
            .map_err(|e| CatalogSyncError::config(format!("Failed to open cache database: {}", e)))?;

        info!("Cache database opened");

        let db = GuardedSqlite::new(cache_pool, COMPONENT).with_path(sqlite_path(&cache_url));
        let engine = SyncEngine::new(Arc::new(source), db);
        let runner = SyncRunner::new(engine, Arc::new(DefaultMappings::new()));

        let options = RunOptions { batch_size, budget, resume };
        Ok(Self { runner, options })
    }
}

/// File portion of an sqlite URL, for guard diagnostics.
fn sqlite_path(url: &str) -> String {
    url.trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .to_string()
}
