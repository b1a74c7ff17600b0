//! Error types for the repository crate.

pub mod dialect;
pub mod repository;
pub mod source;

pub use dialect::DialectGuardError;
pub use repository::RepositoryError;
pub use source::SourceError;
