//! # mahuta-elasticsearch -- Elasticsearch indexing backend
//!
//! [`ElasticSearchIndexer`] implements [`mahuta_core::IndexingService`] over
//! the Elasticsearch REST API. Every write uses `refresh=true` so a search
//! issued right after `index`, `deindex` or `update_field` sees the change.
//!
//! [`translate`] turns a backend-agnostic [`Query`](mahuta_core::Query) and
//! [`PageRequest`](mahuta_core::PageRequest) into a `_search` request body.

pub mod config;
pub mod error;
pub mod indexer;
pub mod translate;

pub use config::{ConfigError, ElasticConfig};
pub use error::ElasticError;
pub use indexer::ElasticSearchIndexer;
