//! Error types for the sync engine.

use catalog_sync_repository::{RepositoryError, SourceError};
use thiserror::Error;

/// Fatal errors of a sync invocation.
///
/// Row-level validation problems are not errors of this type; they are
/// counted per batch and reported through the batch result instead.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Destination-side failure (connectivity, dialect guard, schema).
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Source-side failure; carries truncated SQL and parameters.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// No mapping registered for the requested entity type.
    #[error("No mapping registered for entity type '{0}'")]
    MappingNotFound(String),

    /// A tree operation was requested for a flat entity.
    #[error("Entity type '{0}' is not tree-shaped")]
    NotTreeShaped(String),
}
