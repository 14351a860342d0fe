//! # Bootstrap
//!
//! Wires the configured backends into a [`MahutaService`], creates the
//! indices listed in the configuration and starts the pinning reconciler.

use std::sync::Arc;

use anyhow::Context;
use mahuta_core::memory::{MemoryIndexer, MemoryPinning, MemoryStorage};
use mahuta_core::{
    CreateIndexRequest, IndexingService, MahutaResult, MahutaService, PinningReconciler,
    StorageService,
};
use mahuta_elasticsearch::{ElasticConfig, ElasticSearchIndexer};
use mahuta_ipfs::{IpfsConfig, IpfsStorage};

use crate::config::{AppConfig, IndexerBackend, StorageBackend};
use crate::state::AppState;

/// A wired application and its background reconciler.
#[derive(Debug)]
pub struct Runtime {
    pub state: AppState,
    pub reconciler: Option<Arc<PinningReconciler>>,
}

impl Runtime {
    /// Stop background work. Call after the HTTP server has drained.
    pub async fn shutdown(&self) {
        if let Some(reconciler) = &self.reconciler {
            reconciler.stop().await;
        }
    }
}

/// Connect the configured backends and assemble the runtime.
pub async fn bootstrap(config: AppConfig) -> anyhow::Result<Runtime> {
    let storage: Arc<dyn StorageService> = match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, content is lost on restart");
            Arc::new(MemoryStorage::new().with_replica(Arc::new(MemoryPinning::new("memory"))))
        }
        StorageBackend::Ipfs => {
            let ipfs = IpfsConfig::from_env().context("invalid IPFS configuration")?;
            Arc::new(IpfsStorage::connect(&ipfs).await?)
        }
    };

    let indexer: Arc<dyn IndexingService> = match config.indexer {
        IndexerBackend::Memory => {
            tracing::warn!("using in-memory indexer, metadata is lost on restart");
            Arc::new(MemoryIndexer::new())
        }
        IndexerBackend::Elasticsearch => {
            let es = ElasticConfig::from_env().context("invalid Elasticsearch configuration")?;
            Arc::new(ElasticSearchIndexer::connect(es).await?)
        }
    };

    Ok(assemble(config, storage, indexer).await?)
}

/// Build the runtime over already connected backends.
pub async fn assemble(
    config: AppConfig,
    storage: Arc<dyn StorageService>,
    indexer: Arc<dyn IndexingService>,
) -> MahutaResult<Runtime> {
    let service = MahutaService::new(storage, indexer);
    tracing::info!(
        storage = service.storage().name(),
        indexer = service.indexer().name(),
        replicas = ?service.storage().replica_set().names(),
        "backends ready"
    );

    for index in &config.index_configs {
        service
            .create_index(
                CreateIndexRequest::new(index.name.as_str())
                    .with_configuration(index.configuration.clone()),
            )
            .await?;
        tracing::info!(index = %index.name, "configured index ready");
    }

    let reconciler = if config.reconciler_period.is_zero() {
        tracing::info!("pinning reconciler disabled");
        None
    } else {
        let reconciler = Arc::new(PinningReconciler::new(&service, config.reconciler_period));
        reconciler.start();
        Some(reconciler)
    };

    Ok(Runtime {
        state: AppState::new(service, config),
        reconciler,
    })
}
