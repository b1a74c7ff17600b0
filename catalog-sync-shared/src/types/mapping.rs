//! Entity mapping descriptors consumed from the mapping provider.
//!
//! A mapping tells the engine where an entity lives in the source, which
//! column is its business key, which columns to select and how they are
//! typed on the destination side. Mappings are supplied externally; the
//! engine never hard-codes table or column names.

use serde::{Deserialize, Serialize};

/// Column roles for tree-shaped entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeColumns {
    /// Column holding the display name of a node.
    pub name_column: String,
    /// Column holding the parent business key (0 / NULL means root).
    pub parent_column: String,
}

/// Per-entity sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMapping {
    /// Entity type key, also the `sync_state` row key (e.g. "items").
    pub entity: String,
    /// Source table name, possibly schema-qualified.
    pub source_table: String,
    /// Business key column, totally orderable, unique per row.
    pub key_column: String,
    /// Optional source-side filter predicate (SQL fragment).
    pub filter: Option<String>,
    /// Ordered list of selected source columns.
    pub select: Vec<String>,
    /// Columns that get an INTEGER destination type.
    pub numeric_int: Vec<String>,
    /// Columns that get a REAL destination type.
    pub numeric_real: Vec<String>,
    /// Fields compared when building a change diff. Empty means "all
    /// selected columns".
    pub tracked: Vec<String>,
    /// Destination table name.
    pub target_table: String,
    /// Present for tree-shaped entities; enables the path builder pass.
    pub tree: Option<TreeColumns>,
}

impl EntityMapping {
    /// The fields the change tracker diffs on update.
    pub fn tracked_fields(&self) -> &[String] {
        if self.tracked.is_empty() {
            &self.select
        } else {
            &self.tracked
        }
    }

    /// Destination column type for a selected source column.
    pub fn column_type(&self, column: &str) -> &'static str {
        if self.numeric_int.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            "INTEGER"
        } else if self.numeric_real.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            "REAL"
        } else {
            "TEXT"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> EntityMapping {
        EntityMapping {
            entity: "items".into(),
            source_table: "erp_items".into(),
            key_column: "item_id".into(),
            filter: None,
            select: vec!["item_id".into(), "price".into(), "stock".into()],
            numeric_int: vec!["stock".into()],
            numeric_real: vec!["price".into()],
            tracked: vec![],
            target_table: "items".into(),
            tree: None,
        }
    }

    #[test]
    fn column_types_follow_allowlists() {
        let m = mapping();
        assert_eq!(m.column_type("stock"), "INTEGER");
        assert_eq!(m.column_type("Stock"), "INTEGER");
        assert_eq!(m.column_type("price"), "REAL");
        assert_eq!(m.column_type("item_id"), "TEXT");
    }

    #[test]
    fn tracked_defaults_to_select() {
        let m = mapping();
        assert_eq!(m.tracked_fields(), m.select.as_slice());
    }
}
