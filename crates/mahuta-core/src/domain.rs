//! # Domain Model
//!
//! [`Metadata`] describes one indexed document. The request/response pairs
//! below are the inputs and outputs of the six orchestration operations on
//! [`MahutaService`](crate::MahutaService).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncRead;

use crate::page::{Page, PageRequest};
use crate::query::Query;

/// Free-form searchable fields attached to a document.
pub type IndexFields = serde_json::Map<String, Value>;

/// Streaming content source. Consumed fully by the storage backend.
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

// -- Metadata -----------------------------------------------------------------

/// One indexed document.
///
/// `(index_name, index_doc_id)` identifies a document; `content_id` may be
/// shared by several documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "index")]
    pub index_name: String,
    #[serde(rename = "id")]
    pub index_doc_id: String,
    #[serde(rename = "content_id", alias = "hash", default)]
    pub content_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub index_fields: IndexFields,
}

impl Metadata {
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }
}

/// Outcome marker carried by every response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    #[default]
    Success,
    Error,
}

// -- Indexing -----------------------------------------------------------------

/// Fields shared by every indexing variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexingHeader {
    pub index_name: String,
    pub index_doc_id: Option<String>,
    pub content_type: Option<String>,
    pub index_fields: IndexFields,
}

impl IndexingHeader {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            ..Self::default()
        }
    }
}

/// Binary content to store.
pub enum Content {
    Bytes(Vec<u8>),
    Stream(ContentStream),
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Input of [`MahutaService::index`](crate::MahutaService::index), dispatched on
/// where the content comes from.
#[derive(Debug)]
pub enum IndexingRequest {
    /// Store the content, then index it.
    Store { header: IndexingHeader, content: Content },
    /// Index content that is already stored under `content_id`.
    Cid { header: IndexingHeader, content_id: String },
    /// Store a string as UTF-8, then index it.
    Text { header: IndexingHeader, content: String },
    /// Store the content without indexing or pinning it.
    StoreOnly { content: Content },
}

impl IndexingRequest {
    pub fn bytes(index_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::Store {
            header: IndexingHeader::new(index_name),
            content: Content::Bytes(content.into()),
        }
    }

    pub fn stream(index_name: impl Into<String>, content: ContentStream) -> Self {
        Self::Store {
            header: IndexingHeader::new(index_name),
            content: Content::Stream(content),
        }
    }

    pub fn cid(index_name: impl Into<String>, content_id: impl Into<String>) -> Self {
        Self::Cid {
            header: IndexingHeader::new(index_name),
            content_id: content_id.into(),
        }
    }

    pub fn text(index_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Text {
            header: IndexingHeader::new(index_name),
            content: content.into(),
        }
    }

    pub fn store_only(content: impl Into<Content>) -> Self {
        Self::StoreOnly {
            content: content.into(),
        }
    }

    /// Shared fields, absent for [`IndexingRequest::StoreOnly`].
    pub fn header(&self) -> Option<&IndexingHeader> {
        match self {
            Self::Store { header, .. } | Self::Cid { header, .. } | Self::Text { header, .. } => {
                Some(header)
            }
            Self::StoreOnly { .. } => None,
        }
    }

    fn header_mut(&mut self) -> Option<&mut IndexingHeader> {
        match self {
            Self::Store { header, .. } | Self::Cid { header, .. } | Self::Text { header, .. } => {
                Some(header)
            }
            Self::StoreOnly { .. } => None,
        }
    }

    pub fn with_id(mut self, index_doc_id: impl Into<String>) -> Self {
        if let Some(h) = self.header_mut() {
            h.index_doc_id = Some(index_doc_id.into());
        }
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        if let Some(h) = self.header_mut() {
            h.content_type = Some(content_type.into());
        }
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(h) = self.header_mut() {
            h.index_fields.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_fields(mut self, fields: IndexFields) -> Self {
        if let Some(h) = self.header_mut() {
            h.index_fields.extend(fields);
        }
        self
    }
}

/// Result of an indexing operation. Only `content_id` is set for store-only requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingResponse {
    pub status: ResponseStatus,
    #[serde(rename = "index", default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub index_doc_id: Option<String>,
    pub content_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub index_fields: IndexFields,
}

// -- Deindexing ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeindexingRequest {
    pub index_name: String,
    pub index_doc_id: String,
}

impl DeindexingRequest {
    pub fn new(index_name: impl Into<String>, index_doc_id: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            index_doc_id: index_doc_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeindexingResponse {
    pub status: ResponseStatus,
}

// -- Get ----------------------------------------------------------------------

/// Lookup by index document id or by content id. Exactly one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRequest {
    pub index_name: Option<String>,
    pub index_doc_id: Option<String>,
    pub content_id: Option<String>,
    pub load_file: bool,
}

impl GetRequest {
    pub fn by_id(index_name: impl Into<String>, index_doc_id: impl Into<String>) -> Self {
        Self {
            index_name: Some(index_name.into()),
            index_doc_id: Some(index_doc_id.into()),
            ..Self::default()
        }
    }

    /// Lookup by content id across all indices, see [`GetRequest::in_index`].
    pub fn by_content_id(content_id: impl Into<String>) -> Self {
        Self {
            content_id: Some(content_id.into()),
            ..Self::default()
        }
    }

    pub fn in_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn load_file(mut self, load_file: bool) -> Self {
        self.load_file = load_file;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetResponse {
    pub status: ResponseStatus,
    pub metadata: Metadata,
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
}

// -- Search -------------------------------------------------------------------

/// Paged search. `index_name = None` searches every index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub index_name: Option<String>,
    pub query: Query,
    pub page_request: Option<PageRequest>,
    pub load_file: bool,
}

impl SearchRequest {
    pub fn new(index_name: impl Into<String>, query: Query, page_request: PageRequest) -> Self {
        Self {
            index_name: Some(index_name.into()),
            query,
            page_request: Some(page_request),
            load_file: false,
        }
    }

    pub fn load_file(mut self, load_file: bool) -> Self {
        self.load_file = load_file;
        self
    }
}

/// A search hit, with the stored content when it was requested and readable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataAndPayload {
    #[serde(flatten)]
    pub metadata: Metadata,
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub status: ResponseStatus,
    #[serde(flatten)]
    pub page: Page<MetadataAndPayload>,
}

// -- Index administration -----------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexRequest {
    pub name: String,
    /// Backend-specific schema, applied only when the index is first created.
    pub configuration: Option<Value>,
}

impl CreateIndexRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configuration: None,
        }
    }

    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = Some(configuration);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndexResponse {
    pub status: ResponseStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetIndexesResponse {
    pub status: ResponseStatus,
    pub indexes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateFieldRequest {
    pub index_name: String,
    pub index_doc_id: String,
    pub key: String,
    pub value: Value,
}

impl UpdateFieldRequest {
    pub fn new(
        index_name: impl Into<String>,
        index_doc_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            index_doc_id: index_doc_id.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFieldResponse {
    pub status: ResponseStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_accepts_hash_alias() {
        let m: Metadata = serde_json::from_value(json!({
            "index": "docs", "id": "1", "hash": "Qm1", "index_fields": {"a": 1}
        }))
        .unwrap();
        assert_eq!(m.content_id(), Some("Qm1"));
        assert_eq!(m.index_fields["a"], 1);
    }

    #[test]
    fn metadata_serializes_content_id() {
        let m = Metadata {
            index_name: "docs".into(),
            index_doc_id: "1".into(),
            content_id: Some("Qm1".into()),
            content_type: None,
            index_fields: IndexFields::new(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["content_id"], "Qm1");
        assert!(json.get("content_type").is_none());
    }

    #[test]
    fn builders_fill_the_header() {
        let req = IndexingRequest::text("docs", "hello")
            .with_id("doc-1")
            .with_content_type("text/plain")
            .with_field("author", "alice");
        let h = req.header().unwrap();
        assert_eq!(h.index_name, "docs");
        assert_eq!(h.index_doc_id.as_deref(), Some("doc-1"));
        assert_eq!(h.content_type.as_deref(), Some("text/plain"));
        assert_eq!(h.index_fields["author"], "alice");
    }

    #[test]
    fn store_only_has_no_header() {
        let req = IndexingRequest::store_only(b"x".to_vec()).with_id("ignored");
        assert!(req.header().is_none());
    }

    #[test]
    fn store_only_response_omits_index_fields() {
        let resp = IndexingResponse {
            status: ResponseStatus::Success,
            index_name: None,
            index_doc_id: None,
            content_id: "Qm1".into(),
            content_type: None,
            index_fields: IndexFields::new(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert!(json.get("index").is_none());
        assert!(json.get("id").is_none());
    }
}
