//! # Application State
//!
//! Shared state for the Axum application: the orchestration service and the
//! process configuration. Cloned per request; both fields are reference
//! counted.

use std::sync::Arc;

use mahuta_core::memory::{MemoryIndexer, MemoryStorage};
use mahuta_core::MahutaService;

use crate::config::AppConfig;

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<MahutaService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(service: MahutaService, config: AppConfig) -> Self {
        Self {
            service: Arc::new(service),
            config: Arc::new(config),
        }
    }

    /// State over fresh in-memory backends.
    pub fn in_memory() -> Self {
        let service = MahutaService::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryIndexer::new()),
        );
        Self::new(service, AppConfig::in_memory())
    }
}
