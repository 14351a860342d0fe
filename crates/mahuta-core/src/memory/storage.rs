use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::domain::ContentStream;
use crate::error::{MahutaError, MahutaResult};
use crate::pinning::PinningStrategy;
use crate::storage::{HealthCheck, ReplicaSet, StorageService};

/// Deterministic content id: `sha256-` followed by the hex SHA-256 digest.
pub fn content_id_for(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("sha256-{hex}")
}

/// Content-addressed blob store held in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: DashMap<String, Arc<Vec<u8>>>,
    pinned: DashSet<String>,
    replicas: ReplicaSet,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a replica. Only valid before the storage is shared.
    pub fn with_replica(mut self, replica: Arc<dyn PinningStrategy>) -> Self {
        self.replicas.push(replica);
        self
    }

    /// Number of distinct blobs stored.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn store(&self, content: Vec<u8>) -> String {
        let id = content_id_for(&content);
        self.blobs
            .entry(id.clone())
            .or_insert_with(|| Arc::new(content));
        tracing::debug!(content_id = %id, "content stored in memory");
        id
    }
}

#[async_trait]
impl StorageService for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write(&self, content: Vec<u8>) -> MahutaResult<String> {
        Ok(self.store(content))
    }

    async fn write_stream(&self, mut content: ContentStream) -> MahutaResult<String> {
        let mut buf = Vec::new();
        content
            .read_to_end(&mut buf)
            .await
            .map_err(|e| MahutaError::technical("Error whilst reading the content stream", e))?;
        Ok(self.store(buf))
    }

    async fn read(&self, content_id: &str) -> MahutaResult<Vec<u8>> {
        self.blobs
            .get(content_id)
            .map(|blob| blob.as_ref().clone())
            .ok_or_else(|| MahutaError::NotFound(format!("content {content_id} not found")))
    }

    async fn pin(&self, content_id: &str) -> MahutaResult<()> {
        if !self.blobs.contains_key(content_id) {
            return Err(MahutaError::NotFound(format!("content {content_id} not found")));
        }
        self.pinned.insert(content_id.to_string());
        Ok(())
    }

    async fn unpin(&self, content_id: &str) -> MahutaResult<()> {
        self.pinned.remove(content_id);
        Ok(())
    }

    async fn list_pinned(&self) -> MahutaResult<Vec<String>> {
        let mut ids: Vec<String> = self.pinned.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    fn replica_set(&self) -> &ReplicaSet {
        &self.replicas
    }

    async fn check(&self) -> HealthCheck {
        HealthCheck::healthy()
    }
}
