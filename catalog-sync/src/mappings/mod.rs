//! Entity mapping provider.
//!
//! Mappings describe, per entity type, where the rows live in the ERP
//! source and how they land in the read cache. The engine consumes them
//! through the [`MappingProvider`] trait; the built-in provider covers
//! the storefront's two entities.

use catalog_sync_shared::{EntityMapping, TreeColumns};

use crate::errors::SyncError;

/// Supplies the entity mappings the engine runs against.
pub trait MappingProvider: Send + Sync {
    /// All known entity types, in sync order.
    fn entities(&self) -> Vec<String>;

    /// Mapping for one entity type.
    fn mapping(&self, entity: &str) -> Result<EntityMapping, SyncError>;
}

/// Built-in mappings for the storefront catalog: flat `items` and
/// tree-shaped `categories`.
#[derive(Default)]
pub struct DefaultMappings;

impl DefaultMappings {
    pub fn new() -> Self {
        Self
    }

    fn items() -> EntityMapping {
        EntityMapping {
            entity: "items".into(),
            source_table: "erp_items".into(),
            key_column: "item_no".into(),
            filter: Some("active = 1".into()),
            select: vec![
                "item_no".into(),
                "name".into(),
                "description".into(),
                "category_id".into(),
                "price".into(),
                "stock".into(),
                "unit".into(),
                "ean".into(),
            ],
            numeric_int: vec!["stock".into(), "category_id".into()],
            numeric_real: vec!["price".into()],
            tracked: vec![
                "name".into(),
                "description".into(),
                "category_id".into(),
                "price".into(),
                "stock".into(),
            ],
            target_table: "items".into(),
            tree: None,
        }
    }

    fn categories() -> EntityMapping {
        EntityMapping {
            entity: "categories".into(),
            source_table: "erp_categories".into(),
            key_column: "category_id".into(),
            filter: None,
            select: vec![
                "category_id".into(),
                "name".into(),
                "parent_id".into(),
                "sort_order".into(),
            ],
            numeric_int: vec![
                "category_id".into(),
                "parent_id".into(),
                "sort_order".into(),
            ],
            numeric_real: vec![],
            tracked: vec!["name".into(), "parent_id".into(), "sort_order".into()],
            target_table: "categories".into(),
            tree: Some(TreeColumns {
                name_column: "name".into(),
                parent_column: "parent_id".into(),
            }),
        }
    }
}

impl MappingProvider for DefaultMappings {
    fn entities(&self) -> Vec<String> {
        vec!["categories".into(), "items".into()]
    }

    fn mapping(&self, entity: &str) -> Result<EntityMapping, SyncError> {
        match entity {
            "items" => Ok(Self::items()),
            "categories" => Ok(Self::categories()),
            other => Err(SyncError::MappingNotFound(other.to_string())),
        }
    }
}
