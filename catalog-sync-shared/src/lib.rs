//! # Catalog Sync Shared
//!
//! Shared types and pure algorithms for the storefront catalog sync:
//! field values, entity mappings, sync state, the change-diff builder
//! and the canonical row hash.
//!
//! Everything in this crate is storage-agnostic and side-effect free.

pub mod diff;
pub mod hash;
pub mod types;

pub use diff::{build_diff, encode_diff, ChangeDiff, FieldChange};
pub use hash::row_hash;
pub use types::{
    BatchReport, ComputedPaths, EntityMapping, FieldMap, FieldValue, HierarchyNode, RunReport,
    SyncState, TreeColumns,
};
