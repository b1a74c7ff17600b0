//! Core data types shared between the sync engine and the repositories.

pub mod field_value;
pub mod hierarchy;
pub mod mapping;
pub mod sync_state;

pub use field_value::{FieldMap, FieldValue};
pub use hierarchy::{ComputedPaths, HierarchyNode};
pub use mapping::{EntityMapping, TreeColumns};
pub use sync_state::{BatchReport, RunReport, SyncState};
