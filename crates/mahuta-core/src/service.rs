//! # Orchestration Service
//!
//! [`MahutaService`] sequences the storage backend, the document index and the
//! replica set for each of the core operations. It keeps no state of its own.
//!
//! ## Indexing
//!
//! ```text
//! validate → write content (unless CID) → index metadata → respond
//!                                              └→ background: pin on every replica,
//!                                                 then mark the document pinned
//! ```
//!
//! Replication at write time is best-effort: replica failures are logged and
//! left to the [`PinningReconciler`](crate::PinningReconciler). Deindexing is
//! the opposite: the document is deleted first, then every replica is
//! unpinned and any unpin failure is returned to the caller even though the
//! document is already gone. Documents still referencing the unpinned content
//! are flagged unpinned so the reconciler restores their replicas.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::io::AsyncReadExt;

use crate::domain::{
    Content, ContentStream, CreateIndexRequest, CreateIndexResponse, DeindexingRequest,
    DeindexingResponse, GetIndexesResponse, GetRequest, GetResponse, IndexingHeader,
    IndexingRequest, IndexingResponse, Metadata, MetadataAndPayload, ResponseStatus,
    SearchRequest, SearchResponse, UpdateFieldRequest, UpdateFieldResponse,
};
use crate::error::{reject_if_empty, MahutaError, MahutaResult};
use crate::indexing::{IndexingService, HASH_INDEX_KEY, PINNED_INDEX_KEY};
use crate::mime;
use crate::page::PageRequest;
use crate::pool::WorkerPool;
use crate::query::Query;
use crate::storage::{ReplicaSet, StorageService};

/// Page size used when walking the documents that share a content id.
const SHARED_CONTENT_PAGE_SIZE: usize = 50;

/// Entry point for all content and index operations.
#[derive(Clone)]
pub struct MahutaService {
    storage: Arc<dyn StorageService>,
    indexer: Arc<dyn IndexingService>,
    pin_pool: WorkerPool,
}

impl std::fmt::Debug for MahutaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MahutaService")
            .field("storage", &self.storage.name())
            .field("indexer", &self.indexer.name())
            .field("replicas", self.storage.replica_set())
            .field("pin_pool", &self.pin_pool)
            .finish()
    }
}

impl MahutaService {
    pub fn new(storage: Arc<dyn StorageService>, indexer: Arc<dyn IndexingService>) -> Self {
        Self {
            storage,
            indexer,
            pin_pool: WorkerPool::new("pinning", crate::pool::DEFAULT_POOL_SIZE),
        }
    }

    /// Use a dedicated pool for the background pin fan-out.
    pub fn with_pin_pool(mut self, pool: WorkerPool) -> Self {
        self.pin_pool = pool;
        self
    }

    pub fn storage(&self) -> &Arc<dyn StorageService> {
        &self.storage
    }

    pub fn indexer(&self) -> &Arc<dyn IndexingService> {
        &self.indexer
    }

    // ── Index administration ─────────────────────────────────────────

    pub async fn create_index(&self, request: CreateIndexRequest) -> MahutaResult<CreateIndexResponse> {
        reject_if_empty("name", Some(&request.name))?;
        self.indexer
            .create_index(&request.name, request.configuration.as_ref())
            .await?;
        Ok(CreateIndexResponse {
            status: ResponseStatus::Success,
        })
    }

    pub async fn get_indexes(&self) -> MahutaResult<GetIndexesResponse> {
        Ok(GetIndexesResponse {
            status: ResponseStatus::Success,
            indexes: self.indexer.get_indexes().await?,
        })
    }

    // ── Index ────────────────────────────────────────────────────────

    /// Store (unless the request carries a content id), index, and schedule
    /// replication.
    pub async fn index(&self, request: IndexingRequest) -> MahutaResult<IndexingResponse> {
        validate_indexing(&request)?;

        let (header, content_id) = match request {
            IndexingRequest::StoreOnly { content } => {
                let (content_id, _) = self.store(content, None).await?;
                return Ok(IndexingResponse {
                    status: ResponseStatus::Success,
                    index_name: None,
                    index_doc_id: None,
                    content_id,
                    content_type: None,
                    index_fields: Default::default(),
                });
            }
            IndexingRequest::Store { mut header, content } => {
                let (content_id, sniffed) = self.store(content, header.content_type.as_deref()).await?;
                header.content_type = sniffed;
                (header, content_id)
            }
            IndexingRequest::Text { mut header, content } => {
                let (content_id, sniffed) = self
                    .store(Content::Bytes(content.into_bytes()), header.content_type.as_deref())
                    .await?;
                header.content_type = sniffed;
                (header, content_id)
            }
            IndexingRequest::Cid { header, content_id } => (header, content_id),
        };

        let IndexingHeader {
            index_name,
            index_doc_id,
            content_type,
            index_fields,
        } = header;

        let index_doc_id = self
            .indexer
            .index(
                &index_name,
                index_doc_id.as_deref(),
                Some(&content_id),
                content_type.as_deref(),
                &index_fields,
            )
            .await?;
        tracing::info!(index = %index_name, id = %index_doc_id, content_id = %content_id, "content indexed");

        self.replicate(index_name.clone(), index_doc_id.clone(), content_id.clone());

        Ok(IndexingResponse {
            status: ResponseStatus::Success,
            index_name: Some(index_name),
            index_doc_id: Some(index_doc_id),
            content_id,
            content_type,
            index_fields,
        })
    }

    /// Write content and resolve its content type: the declared one, or a
    /// sniffed one when none was declared.
    async fn store(
        &self,
        content: Content,
        declared: Option<&str>,
    ) -> MahutaResult<(String, Option<String>)> {
        let declared = declared.filter(|ct| !ct.trim().is_empty()).map(str::to_string);
        match content {
            Content::Bytes(bytes) => {
                let content_type = declared.or_else(|| mime::sniff(&bytes).map(str::to_string));
                let content_id = self.storage.write(bytes).await?;
                Ok((content_id, content_type))
            }
            Content::Stream(stream) => {
                let (stream, sniffed) = if declared.is_some() {
                    (stream, None)
                } else {
                    sniff_stream(stream).await
                };
                let content_id = self.storage.write_stream(stream).await?;
                Ok((content_id, declared.or(sniffed)))
            }
        }
    }

    /// Fire-and-forget pin on every replica. The document is flagged pinned
    /// when all replicas succeed; otherwise the reconciler retries later.
    fn replicate(&self, index_name: String, index_doc_id: String, content_id: String) {
        let replicas = self.storage.replica_set().clone();
        let indexer = Arc::clone(&self.indexer);
        let label = format!("replicate {content_id}");
        self.pin_pool.fire_and_forget(label, async move {
            if pin_on_replicas(&replicas, &content_id).await {
                indexer
                    .update_field(&index_name, &index_doc_id, PINNED_INDEX_KEY, Value::Bool(true))
                    .await?;
                tracing::debug!(index = %index_name, id = %index_doc_id, "document marked pinned");
            }
            Ok(())
        });
    }

    // ── Deindex ──────────────────────────────────────────────────────

    /// Delete a document, then unpin its content from every replica.
    ///
    /// # Errors
    ///
    /// `NotFound` when the document does not exist. An unpin failure is
    /// returned after the document has already been removed from the index.
    pub async fn deindex(&self, request: DeindexingRequest) -> MahutaResult<DeindexingResponse> {
        reject_if_empty("index", Some(&request.index_name))?;
        reject_if_empty("id", Some(&request.index_doc_id))?;

        let metadata = self
            .indexer
            .get_document(&request.index_name, &request.index_doc_id)
            .await?;
        self.indexer
            .deindex(&request.index_name, &request.index_doc_id)
            .await?;
        tracing::info!(index = %request.index_name, id = %request.index_doc_id, "document deindexed");

        if let Some(content_id) = metadata.content_id() {
            let mut first_failure = None;
            for replica in self.storage.replica_set().iter() {
                if let Err(err) = replica.unpin(content_id).await {
                    tracing::error!(
                        strategy = replica.name(),
                        content_id,
                        error = %err,
                        "unpin failed after deindexing"
                    );
                    first_failure.get_or_insert(err);
                }
            }
            if !self.storage.replica_set().is_empty() {
                self.release_shared_content(content_id).await;
            }
            if let Some(err) = first_failure {
                return Err(err);
            }
        }

        Ok(DeindexingResponse {
            status: ResponseStatus::Success,
        })
    }

    /// Other documents may reference the content just unpinned. Flag them
    /// unpinned so the reconciler pins the content again. Failures are logged.
    async fn release_shared_content(&self, content_id: &str) {
        let query = Query::new().equals(HASH_INDEX_KEY, content_id);
        let mut request = PageRequest::default().with_size(SHARED_CONTENT_PAGE_SIZE);
        loop {
            let page = match self.indexer.search_documents(None, &query, &request).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(content_id, error = %err, "unable to find documents sharing unpinned content");
                    return;
                }
            };
            let last = page.is_last();
            let next = page.next_page_request();
            for shared in page.into_elements() {
                match self
                    .indexer
                    .update_field(&shared.index_name, &shared.index_doc_id, PINNED_INDEX_KEY, Value::Bool(false))
                    .await
                {
                    Ok(()) => tracing::info!(
                        index = %shared.index_name,
                        id = %shared.index_doc_id,
                        content_id,
                        "shared content unpinned, document queued for reconciliation"
                    ),
                    Err(err) => tracing::warn!(
                        index = %shared.index_name,
                        id = %shared.index_doc_id,
                        error = %err,
                        "unable to reset pinned flag"
                    ),
                }
            }
            if last {
                return;
            }
            request = next;
        }
    }

    // ── Get ──────────────────────────────────────────────────────────

    /// Look a document up by index document id, or else by content id.
    pub async fn get(&self, request: GetRequest) -> MahutaResult<GetResponse> {
        let index_doc_id = non_blank(request.index_doc_id.as_deref());
        let content_id = non_blank(request.content_id.as_deref());
        let index_name = non_blank(request.index_name.as_deref());

        let metadata = match (index_doc_id, content_id) {
            (Some(id), _) => {
                reject_if_empty("index", index_name)?;
                self.indexer
                    .get_document(index_name.unwrap_or_default(), id)
                    .await?
            }
            (None, Some(cid)) => self.find_by_content_id(index_name, cid).await?,
            (None, None) => {
                return Err(MahutaError::validation(
                    "either an index document id or a content id is required",
                ))
            }
        };

        let payload = match (request.load_file, metadata.content_id()) {
            (true, Some(cid)) => Some(self.storage.read(cid).await?),
            _ => None,
        };

        Ok(GetResponse {
            status: ResponseStatus::Success,
            metadata,
            payload,
        })
    }

    async fn find_by_content_id(&self, index_name: Option<&str>, content_id: &str) -> MahutaResult<Metadata> {
        let query = Query::new().equals(HASH_INDEX_KEY, content_id);
        let page = self
            .indexer
            .search_documents(index_name, &query, &PageRequest::single_element())
            .await?;
        page.into_elements()
            .into_iter()
            .next()
            .ok_or_else(|| MahutaError::NotFound(format!("content {content_id} is not indexed")))
    }

    // ── Search ───────────────────────────────────────────────────────

    /// Paged search. With `load_file`, each hit carries its content; a hit
    /// whose content cannot be read gets no payload instead of failing the page.
    pub async fn search(&self, request: SearchRequest) -> MahutaResult<SearchResponse> {
        let page_request = request
            .page_request
            .ok_or_else(|| MahutaError::validation("pageRequest shouldn't be null"))?;
        let index_name = non_blank(request.index_name.as_deref());

        let page = self
            .indexer
            .search_documents(index_name, &request.query, &page_request)
            .await?;

        let payloads: Vec<Option<Vec<u8>>> = if request.load_file {
            join_all(page.elements().iter().map(|m| self.load_payload(m))).await
        } else {
            vec![None; page.elements().len()]
        };

        let mut payloads = payloads.into_iter();
        let page = page.map(|metadata| MetadataAndPayload {
            metadata,
            payload: payloads.next().flatten(),
        });

        Ok(SearchResponse {
            status: ResponseStatus::Success,
            page,
        })
    }

    async fn load_payload(&self, metadata: &Metadata) -> Option<Vec<u8>> {
        let content_id = metadata.content_id()?;
        match self.storage.read(content_id).await {
            Ok(payload) => Some(payload),
            Err(err) => {
                tracing::warn!(
                    index = %metadata.index_name,
                    id = %metadata.index_doc_id,
                    content_id,
                    error = %err,
                    "unable to load content for search hit"
                );
                None
            }
        }
    }

    // ── Update field ─────────────────────────────────────────────────

    pub async fn update_field(&self, request: UpdateFieldRequest) -> MahutaResult<UpdateFieldResponse> {
        reject_if_empty("index", Some(&request.index_name))?;
        reject_if_empty("id", Some(&request.index_doc_id))?;
        reject_if_empty("key", Some(&request.key))?;
        self.indexer
            .update_field(&request.index_name, &request.index_doc_id, &request.key, request.value)
            .await?;
        Ok(UpdateFieldResponse {
            status: ResponseStatus::Success,
        })
    }
}

fn validate_indexing(request: &IndexingRequest) -> MahutaResult<()> {
    if let Some(header) = request.header() {
        reject_if_empty("index", Some(&header.index_name))?;
    }
    if let IndexingRequest::Cid { content_id, .. } = request {
        reject_if_empty("content_id", Some(content_id))?;
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Pin `content_id` on every replica concurrently. Returns `true` when all
/// succeeded; each failure is logged with the strategy name.
pub(crate) async fn pin_on_replicas(replicas: &ReplicaSet, content_id: &str) -> bool {
    let results = join_all(replicas.iter().map(|r| async move { (r.name(), r.pin(content_id).await) })).await;
    let mut all_pinned = true;
    for (strategy, result) in results {
        if let Err(err) = result {
            all_pinned = false;
            tracing::warn!(strategy, content_id, error = %err, "pin failed");
        }
    }
    all_pinned
}

/// Read the first bytes of a stream to guess its type, then hand back a
/// stream that replays them.
async fn sniff_stream(mut stream: ContentStream) -> (ContentStream, Option<String>) {
    let mut head = vec![0u8; mime::SNIFF_LEN];
    let mut filled = 0;
    while filled < head.len() {
        match stream.read(&mut head[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) => {
                tracing::debug!(error = %err, "content type detection aborted");
                break;
            }
        }
    }
    head.truncate(filled);
    let sniffed = mime::sniff(&head).map(str::to_string);
    let replay: ContentStream = Box::new(std::io::Cursor::new(head).chain(stream));
    (replay, sniffed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryIndexer, MemoryPinning, MemoryStorage};

    fn service() -> MahutaService {
        MahutaService::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryIndexer::new()))
    }

    #[tokio::test]
    async fn store_only_skips_indexing() {
        let svc = service();
        let resp = svc
            .index(IndexingRequest::store_only(b"raw".to_vec()))
            .await
            .unwrap();
        assert!(resp.index_doc_id.is_none());
        assert_eq!(svc.storage().read(&resp.content_id).await.unwrap(), b"raw");
        assert!(svc.get_indexes().await.unwrap().indexes.is_empty());
    }

    #[tokio::test]
    async fn declared_content_type_wins_over_sniffing() {
        let svc = service();
        svc.create_index(CreateIndexRequest::new("docs")).await.unwrap();
        let resp = svc
            .index(IndexingRequest::bytes("docs", b"%PDF-1.4".to_vec()).with_content_type("application/x-custom"))
            .await
            .unwrap();
        assert_eq!(resp.content_type.as_deref(), Some("application/x-custom"));
    }

    #[tokio::test]
    async fn stream_content_is_sniffed_and_fully_stored() {
        let svc = service();
        svc.create_index(CreateIndexRequest::new("docs")).await.unwrap();
        let mut data = b"%PDF-1.7\n".to_vec();
        data.extend(std::iter::repeat(b'x').take(4096));
        let stream: ContentStream = Box::new(std::io::Cursor::new(data.clone()));

        let resp = svc.index(IndexingRequest::stream("docs", stream)).await.unwrap();
        assert_eq!(resp.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(svc.storage().read(&resp.content_id).await.unwrap(), data);
    }

    #[tokio::test]
    async fn unknown_bytes_leave_content_type_empty() {
        let svc = service();
        svc.create_index(CreateIndexRequest::new("docs")).await.unwrap();
        let resp = svc
            .index(IndexingRequest::bytes("docs", vec![0u8, 1, 2, 3]))
            .await
            .unwrap();
        assert!(resp.content_type.is_none());
    }

    #[tokio::test]
    async fn get_with_both_ids_prefers_document_id() {
        let svc = service();
        svc.create_index(CreateIndexRequest::new("docs")).await.unwrap();
        let a = svc.index(IndexingRequest::text("docs", "a").with_id("a")).await.unwrap();
        let b = svc.index(IndexingRequest::text("docs", "b").with_id("b")).await.unwrap();

        let mut request = GetRequest::by_id("docs", "a");
        request.content_id = Some(b.content_id);
        let resp = svc.get(request).await.unwrap();
        assert_eq!(resp.metadata.content_id, Some(a.content_id));
    }

    #[tokio::test]
    async fn get_by_document_id_requires_index() {
        let svc = service();
        let mut request = GetRequest::by_id("docs", "a");
        request.index_name = None;
        assert!(matches!(svc.get(request).await, Err(MahutaError::Validation(_))));
    }

    #[tokio::test]
    async fn update_field_rejects_blank_key() {
        let svc = service();
        let result = svc
            .update_field(UpdateFieldRequest::new("docs", "a", " ", true))
            .await;
        assert!(matches!(result, Err(MahutaError::Validation(_))));
    }

    #[tokio::test]
    async fn pin_on_replicas_reports_success() {
        let a = Arc::new(MemoryPinning::new("a"));
        let b = Arc::new(MemoryPinning::new("b"));
        let replicas = ReplicaSet::new().with(a.clone()).with(b.clone());
        assert!(pin_on_replicas(&replicas, "cid").await);
        assert!(a.is_tracked("cid") && b.is_tracked("cid"));
    }
}
