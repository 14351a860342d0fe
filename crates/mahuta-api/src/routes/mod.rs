//! # API Route Modules
//!
//! - `index_config`: index creation and listing (`/config/index/*`).
//! - `store`: indexing of existing content ids and store-and-index
//!   (`/raw/*`, `/json/*`).
//! - `query`: raw content fetch and paged search (`/query/*`).
//! - `delete`: deindexing by document id or content id (`/delete/*`).

pub mod delete;
pub mod index_config;
pub mod query;
pub mod store;
