//! Destination-side repository errors.

use thiserror::Error;

use super::DialectGuardError;

/// Errors raised by the SQLite destination repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    DialectGuard(#[from] DialectGuardError),

    /// Adding a required column failed; fatal for the sync pass.
    #[error("Schema reconciliation failed for {table}.{column}: {source}")]
    Schema {
        table: String,
        column: String,
        #[source]
        source: sqlx::Error,
    },
}
