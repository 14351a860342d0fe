//! # In-Memory Backends
//!
//! Process-local implementations of the three capability traits. They back
//! the `memory` storage/indexer modes used for local development and serve as
//! test doubles. Nothing here survives a restart.

mod indexer;
mod matcher;
mod pinning;
mod storage;

pub use indexer::MemoryIndexer;
pub use matcher::matches;
pub use pinning::MemoryPinning;
pub use storage::{content_id_for, MemoryStorage};
