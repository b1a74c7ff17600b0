//! # Catalog Sync
//!
//! Incremental sync engine keeping an embedded SQLite read cache
//! eventually consistent with entities owned by an external ERP database.
//!
//! ## Architecture
//!
//! 1. **Engine**: cursor-based batch extraction with content-hash change
//!    detection and guarded destination writes
//! 2. **Hierarchy**: materialized ancestry paths and SEO slugs for
//!    tree-shaped entities
//! 3. **Runner**: drives the engine batch by batch and triggers the
//!    hierarchy pass
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`engine`]: The cursor batch sync engine
//! - [`hierarchy`]: Materialized path and SEO slug builder
//! - [`runner`]: Multi-batch driver with wall-clock budget
//! - [`mappings`]: Entity mapping provider
//! - [`errors`]: Error types for the sync

pub mod config;
pub mod engine;
pub mod errors;
pub mod hierarchy;
pub mod mappings;
pub mod runner;

pub use config::Dependencies;
pub use errors::SyncError;

use thiserror::Error;

/// Errors that can occur during sync initialization or execution.
#[derive(Error, Debug)]
pub enum CatalogSyncError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Sync error.
    #[error("Sync error: {0}")]
    SyncError(#[from] SyncError),
}

impl CatalogSyncError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
