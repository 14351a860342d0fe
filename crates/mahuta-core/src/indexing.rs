//! # Indexing Service
//!
//! Capability interface for the searchable document index. Adapters store the
//! content id, content type and pinning state under reserved keys in each
//! document so they round-trip through lookups and searches.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{IndexFields, Metadata};
use crate::error::MahutaResult;
use crate::page::{Page, PageRequest};
use crate::query::Query;

/// Reserved key holding the content id.
pub const HASH_INDEX_KEY: &str = "__hash";
/// Reserved key holding the content type.
pub const CONTENT_TYPE_INDEX_KEY: &str = "__content_type";
/// Reserved key flipped to `true` once every replica has pinned the content.
pub const PINNED_INDEX_KEY: &str = "__pinned";
/// Index name addressing every index.
pub const ALL_INDICES: &str = "_all";

/// Returns `true` for keys managed by the indexing layer itself.
pub fn is_reserved_key(key: &str) -> bool {
    matches!(key, HASH_INDEX_KEY | CONTENT_TYPE_INDEX_KEY | PINNED_INDEX_KEY)
}

/// Generate a random document id (UUID v4 without separators).
pub fn generate_doc_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Search index backend.
#[async_trait]
pub trait IndexingService: Send + Sync {
    fn name(&self) -> &str;

    /// Create an index. Existing indices are left untouched and the
    /// configuration is only applied on first creation.
    async fn create_index(&self, index_name: &str, configuration: Option<&Value>) -> MahutaResult<()>;

    async fn get_indexes(&self) -> MahutaResult<Vec<String>>;

    /// Create or merge-update a document and return its id.
    ///
    /// A new document is created when `index_doc_id` is absent or unknown;
    /// otherwise the given fields are merged into the existing document. The
    /// write is visible to searches once this returns.
    ///
    /// # Errors
    ///
    /// [`MahutaError::NoIndex`](crate::MahutaError::NoIndex) when the index
    /// does not exist.
    async fn index(
        &self,
        index_name: &str,
        index_doc_id: Option<&str>,
        content_id: Option<&str>,
        content_type: Option<&str>,
        index_fields: &IndexFields,
    ) -> MahutaResult<String>;

    /// Delete a document; fails with `NotFound` when it does not exist.
    async fn deindex(&self, index_name: &str, index_doc_id: &str) -> MahutaResult<()>;

    /// Fetch a document; fails with `NotFound` when it does not exist.
    async fn get_document(&self, index_name: &str, index_doc_id: &str) -> MahutaResult<Metadata>;

    /// Set a single field on an existing document.
    async fn update_field(
        &self,
        index_name: &str,
        index_doc_id: &str,
        key: &str,
        value: Value,
    ) -> MahutaResult<()>;

    /// Search one index, or all of them when `index_name` is `None`.
    async fn search_documents(
        &self,
        index_name: Option<&str>,
        query: &Query,
        page_request: &PageRequest,
    ) -> MahutaResult<Page<Metadata>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_have_no_separators() {
        let id = generate_doc_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
        assert_ne!(id, generate_doc_id());
    }

    #[test]
    fn reserved_keys() {
        assert!(is_reserved_key("__hash"));
        assert!(is_reserved_key("__pinned"));
        assert!(!is_reserved_key("author"));
    }
}
