//! In-memory representation of tree-shaped entities for path building.

/// One node of the category tree, loaded fully into memory before a
/// path-build pass. Created and destroyed only by the entity upsert;
/// the path builder just derives `path`, `path_ids` and `seo_url`.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub id: i64,
    pub name: String,
    /// `None` means root. A stored 0 is normalized to `None` on load.
    pub parent_id: Option<i64>,
    pub path: String,
    pub path_ids: String,
    pub seo_url: String,
}

/// Derived path fields computed for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedPaths {
    pub id: i64,
    pub path: String,
    pub path_ids: String,
    pub seo_url: String,
}
