//! Trait seams for the storage sides of the sync.

pub mod source;

pub use source::CatalogSource;
