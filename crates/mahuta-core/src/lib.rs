//! # mahuta-core — Content-Addressable Storage Gateway Core
//!
//! Mahuta stores arbitrary content on a content-addressed backend, indexes
//! metadata about it in a search engine, and replicates it across any number
//! of pinning targets. This crate holds everything that is independent of a
//! concrete backend:
//!
//! - **Query model** ([`query`], [`page`]): backend-agnostic filters and pagination.
//! - **Domain model** ([`domain`]): [`Metadata`] and the request/response pairs.
//! - **Capability traits**: [`StorageService`], [`PinningStrategy`], [`IndexingService`].
//! - **Orchestration** ([`MahutaService`]): the create-index, index, deindex,
//!   get, search and update-field operations.
//! - **Reconciler** ([`PinningReconciler`]): background repair of missing pins.
//! - **In-memory backends** ([`memory`]): development mode and test doubles.
//!
//! ## Consistency
//!
//! Storage and index share no transaction. Within one `index` call the write
//! precedes indexing, which precedes the background pin fan-out. Replication
//! is eventually consistent, driven by the `__pinned` flag on each document.

pub mod domain;
pub mod error;
pub mod indexing;
pub mod memory;
pub mod mime;
pub mod page;
pub mod pinning;
pub mod pool;
pub mod query;
pub mod reconciler;
pub mod service;
pub mod storage;

pub use domain::{
    Content, ContentStream, CreateIndexRequest, CreateIndexResponse, DeindexingRequest,
    DeindexingResponse, GetIndexesResponse, GetRequest, GetResponse, IndexFields,
    IndexingHeader, IndexingRequest, IndexingResponse, Metadata, MetadataAndPayload,
    ResponseStatus, SearchRequest, SearchResponse, UpdateFieldRequest, UpdateFieldResponse,
};
pub use error::{MahutaError, MahutaResult};
pub use indexing::IndexingService;
pub use page::{Page, PageRequest, SortDirection};
pub use pinning::PinningStrategy;
pub use pool::WorkerPool;
pub use query::{Filter, Query, QueryOperation};
pub use reconciler::{PinningReconciler, ReconcileReport};
pub use service::MahutaService;
pub use storage::{HealthCheck, ReplicaSet, StorageService};
