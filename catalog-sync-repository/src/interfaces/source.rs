//! Abstraction over the ERP source database.

use catalog_sync_shared::{EntityMapping, FieldMap};

use crate::errors::SourceError;

/// Read-only access to the ERP tables the sync extracts from.
///
/// The source handle is naturally restricted to its own dialect and is
/// never wrapped by the dialect guard.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch one keyset page.
    ///
    /// Selects the mapping's columns from the source table, restricted to
    /// rows whose business key is greater than `after_key` (all rows when
    /// the token is empty), ordered ascending by key, limited to `limit`.
    async fn fetch_page(
        &self,
        mapping: &EntityMapping,
        after_key: &str,
        limit: i64,
    ) -> Result<Vec<FieldMap>, SourceError>;
}
