use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::matcher::{compare, matches};
use crate::domain::{IndexFields, Metadata};
use crate::error::{MahutaError, MahutaResult};
use crate::indexing::{
    generate_doc_id, is_reserved_key, IndexingService, ALL_INDICES, CONTENT_TYPE_INDEX_KEY,
    HASH_INDEX_KEY, PINNED_INDEX_KEY,
};
use crate::page::{Page, PageRequest, SortDirection};
use crate::query::Query;

type Document = Map<String, Value>;

#[derive(Debug, Default)]
struct MemoryIndex {
    configuration: Option<Value>,
    documents: BTreeMap<String, Document>,
}

/// Document index held in memory, with the same visibility and merge
/// semantics as the search-engine adapter.
///
/// Writes are visible immediately. Unsorted results are ordered by index
/// name, then document id.
#[derive(Debug, Default)]
pub struct MemoryIndexer {
    indices: RwLock<BTreeMap<String, MemoryIndex>>,
}

impl MemoryIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration the index was created with.
    pub fn configuration(&self, index_name: &str) -> Option<Value> {
        self.indices
            .read()
            .get(&index_name.to_lowercase())
            .and_then(|i| i.configuration.clone())
    }

    /// Number of documents in an index.
    pub fn count(&self, index_name: &str) -> usize {
        self.indices
            .read()
            .get(&index_name.to_lowercase())
            .map_or(0, |i| i.documents.len())
    }
}

fn to_metadata(index_name: &str, id: &str, doc: &Document) -> Metadata {
    Metadata {
        index_name: index_name.to_string(),
        index_doc_id: id.to_string(),
        content_id: doc.get(HASH_INDEX_KEY).and_then(Value::as_str).map(str::to_string),
        content_type: doc
            .get(CONTENT_TYPE_INDEX_KEY)
            .and_then(Value::as_str)
            .map(str::to_string),
        index_fields: doc
            .iter()
            .filter(|(k, _)| !is_reserved_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

fn not_found(index_name: &str, index_doc_id: &str) -> MahutaError {
    MahutaError::NotFound(format!(
        "Document not found [index: {index_name}, id: {index_doc_id}]"
    ))
}

#[async_trait]
impl IndexingService for MemoryIndexer {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_index(&self, index_name: &str, configuration: Option<&Value>) -> MahutaResult<()> {
        let name = index_name.to_lowercase();
        let mut indices = self.indices.write();
        if indices.contains_key(&name) {
            tracing::debug!(index = %name, "index already exists");
            return Ok(());
        }
        indices.insert(
            name.clone(),
            MemoryIndex {
                configuration: configuration.cloned(),
                documents: BTreeMap::new(),
            },
        );
        tracing::info!(index = %name, "index created");
        Ok(())
    }

    async fn get_indexes(&self) -> MahutaResult<Vec<String>> {
        Ok(self.indices.read().keys().cloned().collect())
    }

    async fn index(
        &self,
        index_name: &str,
        index_doc_id: Option<&str>,
        content_id: Option<&str>,
        content_type: Option<&str>,
        index_fields: &IndexFields,
    ) -> MahutaResult<String> {
        let name = index_name.to_lowercase();
        let mut indices = self.indices.write();
        let index = indices
            .get_mut(&name)
            .ok_or_else(|| MahutaError::NoIndex(name.clone()))?;

        let mut source: Document = index_fields
            .iter()
            .filter(|(k, _)| !is_reserved_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(cid) = content_id {
            source.insert(HASH_INDEX_KEY.to_string(), Value::from(cid));
        }
        if let Some(ct) = content_type {
            source.insert(CONTENT_TYPE_INDEX_KEY.to_string(), Value::from(ct));
        }
        source.insert(PINNED_INDEX_KEY.to_string(), Value::Bool(false));

        if let Some(id) = index_doc_id {
            if let Some(existing) = index.documents.get_mut(id) {
                existing.extend(source);
                tracing::debug!(index = %name, id, "document updated");
                return Ok(id.to_string());
            }
        }

        let id = index_doc_id.map_or_else(generate_doc_id, str::to_string);
        index.documents.insert(id.clone(), source);
        tracing::debug!(index = %name, id = %id, "document created");
        Ok(id)
    }

    async fn deindex(&self, index_name: &str, index_doc_id: &str) -> MahutaResult<()> {
        let name = index_name.to_lowercase();
        self.indices
            .write()
            .get_mut(&name)
            .and_then(|i| i.documents.remove(index_doc_id))
            .map(|_| ())
            .ok_or_else(|| not_found(&name, index_doc_id))
    }

    async fn get_document(&self, index_name: &str, index_doc_id: &str) -> MahutaResult<Metadata> {
        let name = index_name.to_lowercase();
        let indices = self.indices.read();
        indices
            .get(&name)
            .and_then(|i| i.documents.get(index_doc_id))
            .map(|doc| to_metadata(&name, index_doc_id, doc))
            .ok_or_else(|| not_found(&name, index_doc_id))
    }

    async fn update_field(
        &self,
        index_name: &str,
        index_doc_id: &str,
        key: &str,
        value: Value,
    ) -> MahutaResult<()> {
        let name = index_name.to_lowercase();
        let mut indices = self.indices.write();
        let doc = indices
            .get_mut(&name)
            .and_then(|i| i.documents.get_mut(index_doc_id))
            .ok_or_else(|| not_found(&name, index_doc_id))?;
        doc.insert(key.to_string(), value);
        Ok(())
    }

    async fn search_documents(
        &self,
        index_name: Option<&str>,
        query: &Query,
        page_request: &PageRequest,
    ) -> MahutaResult<Page<Metadata>> {
        let target = index_name
            .map(str::to_lowercase)
            .filter(|n| n != ALL_INDICES);
        let indices = self.indices.read();
        if let Some(name) = &target {
            if !indices.contains_key(name) {
                return Err(MahutaError::NoIndex(name.clone()));
            }
        }

        let mut hits: Vec<(&String, &String, &Document)> = indices
            .iter()
            .filter(|(name, _)| target.as_ref().map_or(true, |t| t == *name))
            .flat_map(|(name, index)| index.documents.iter().map(move |(id, doc)| (name, id, doc)))
            .filter(|(_, _, doc)| matches(query, doc))
            .collect();

        if let Some(field) = page_request.sort() {
            hits.sort_by(|(_, _, a), (_, _, b)| {
                let ord = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => return Ordering::Less,
                    (None, Some(_)) => return Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match page_request.direction() {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        let total = hits.len() as u64;
        let elements = hits
            .into_iter()
            .skip(page_request.offset())
            .take(page_request.size())
            .map(|(name, id, doc)| to_metadata(name, id, doc))
            .collect();
        Ok(Page::new(page_request.clone(), elements, total))
    }
}
