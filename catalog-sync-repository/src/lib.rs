//! # Catalog Sync Repository
//!
//! This crate provides traits and implementations for the storage sides of
//! the catalog sync: the dialect-guarded embedded SQLite destination
//! (state, target and history repositories plus the schema reconciler)
//! and the ERP source connector.

pub mod errors;
pub mod interfaces;
pub mod source;
pub mod sqlite;

pub use errors::{DialectGuardError, RepositoryError, SourceError};
pub use interfaces::CatalogSource;
pub use source::AnySource;
pub use sqlite::{
    DesiredColumn, GuardedSqlite, GuardedTransaction, SchemaReconciler, SqliteHistoryRepository,
    SqliteStateRepository, SqliteTargetRepository,
};
