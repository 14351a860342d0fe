//! [`StorageService`] implementation over an IPFS node.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mahuta_core::{
    ContentStream, HealthCheck, MahutaError, MahutaResult, PinningStrategy, ReplicaSet,
    StorageService, WorkerPool,
};
use tokio::io::AsyncReadExt;

use crate::client::IpfsClient;
use crate::config::IpfsConfig;
use crate::error::IpfsError;
use crate::pinning::{IpfsClusterPinning, IpfsNativePinning, PinataPinning};

/// IPFS-backed storage. Content is added unpinned; the node's native pinning
/// strategy heads the replica set, so the fan-out pins it on the primary too.
#[derive(Debug)]
pub struct IpfsStorage {
    client: IpfsClient,
    pool: WorkerPool,
    timeout: Duration,
    replicas: ReplicaSet,
    name: String,
}

impl IpfsStorage {
    /// Build the storage without contacting the node.
    pub fn new(client: IpfsClient, pool: WorkerPool, timeout: Duration) -> Self {
        let name = format!("ipfs node [{}]", client.address());
        let native: Arc<dyn PinningStrategy> = Arc::new(IpfsNativePinning::new(client.clone()));
        Self {
            client,
            pool,
            timeout,
            replicas: ReplicaSet::new().with(native),
            name,
        }
    }

    /// Connect to the primary node and every configured replica.
    ///
    /// # Errors
    ///
    /// `Connection` when the primary node or any replica is unreachable.
    pub async fn connect(config: &IpfsConfig) -> MahutaResult<Self> {
        let client = IpfsClient::new(config.endpoint.clone(), config.timeout)?;
        let pool = WorkerPool::new("ipfs", config.pool_size);
        let mut storage = Self::new(client, pool, config.timeout);

        let version = storage
            .client
            .version()
            .await
            .map_err(|e| MahutaError::connection(storage.name.clone(), e))?;
        tracing::info!(node = %storage.name, version = %version.version, "connected to IPFS");

        for endpoint in &config.replicas {
            let replica = IpfsNativePinning::connect(endpoint.clone(), config.timeout).await?;
            storage.replicas.push(Arc::new(replica));
        }
        for endpoint in &config.cluster_replicas {
            let replica = IpfsClusterPinning::connect(endpoint.clone(), config.timeout).await?;
            storage.replicas.push(Arc::new(replica));
        }
        if let Some(pinata) = &config.pinata {
            let replica = PinataPinning::connect(pinata, config.timeout).await?;
            storage.replicas.push(Arc::new(replica));
        }

        tracing::info!(node = %storage.name, replicas = ?storage.replicas.names(), "IPFS storage ready");
        Ok(storage)
    }

    /// Append a replica after construction.
    pub fn with_replica(mut self, replica: Arc<dyn PinningStrategy>) -> Self {
        self.replicas.push(replica);
        self
    }

    pub fn client(&self) -> &IpfsClient {
        &self.client
    }
}

#[async_trait]
impl StorageService for IpfsStorage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, content: Vec<u8>) -> MahutaResult<String> {
        let client = self.client.clone();
        let size = content.len();
        let content_id = self
            .pool
            .run_with_deadline("ipfs add", self.timeout, async move {
                Ok(client.add(content, false).await?.hash)
            })
            .await?;
        tracing::debug!(node = %self.name, content_id = %content_id, size, "content written");
        Ok(content_id)
    }

    async fn write_stream(&self, mut content: ContentStream) -> MahutaResult<String> {
        let mut buffer = Vec::new();
        content
            .read_to_end(&mut buffer)
            .await
            .map_err(|source| IpfsError::Io {
                endpoint: "POST /api/v0/add".into(),
                source,
            })?;
        self.write(buffer).await
    }

    async fn read(&self, content_id: &str) -> MahutaResult<Vec<u8>> {
        self.read_with_timeout(content_id, self.timeout).await
    }

    async fn read_with_timeout(&self, content_id: &str, timeout: Duration) -> MahutaResult<Vec<u8>> {
        let client = self.client.clone();
        let cid = content_id.to_string();
        self.pool
            .run_with_deadline("ipfs cat", timeout, async move { Ok(client.cat(&cid).await?) })
            .await
    }

    async fn pin(&self, content_id: &str) -> MahutaResult<()> {
        Ok(self.client.pin_add(content_id).await?)
    }

    async fn unpin(&self, content_id: &str) -> MahutaResult<()> {
        Ok(self.client.pin_rm(content_id).await?)
    }

    async fn list_pinned(&self) -> MahutaResult<Vec<String>> {
        Ok(self.client.pin_ls().await?)
    }

    fn replica_set(&self) -> &ReplicaSet {
        &self.replicas
    }

    async fn check(&self) -> HealthCheck {
        match self.client.version().await {
            Ok(_) => HealthCheck::healthy(),
            Err(err) => HealthCheck::unhealthy(format!("{} is unreachable", self.name), err),
        }
    }
}
