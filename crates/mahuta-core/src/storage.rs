//! # Storage Service
//!
//! Capability interface for content-addressed storage backends. The primary
//! backend is the only one physically written to; replicas listed in the
//! [`ReplicaSet`] only receive pin instructions for the resulting content id.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::ContentStream;
use crate::error::{MahutaError, MahutaResult};
use crate::pinning::PinningStrategy;

/// Outcome of a backend health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl HealthCheck {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: None,
            cause: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            cause: Some(cause.to_string()),
        }
    }
}

/// Ordered list of pinning targets attached to a storage backend.
///
/// Built once at startup and read-only afterwards, so it is shared without
/// locking.
#[derive(Clone, Default)]
pub struct ReplicaSet {
    replicas: Vec<Arc<dyn PinningStrategy>>,
}

impl ReplicaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, replica: Arc<dyn PinningStrategy>) -> Self {
        self.replicas.push(replica);
        self
    }

    pub fn push(&mut self, replica: Arc<dyn PinningStrategy>) {
        self.replicas.push(replica);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PinningStrategy>> {
        self.replicas.iter()
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Replica names, in order.
    pub fn names(&self) -> Vec<String> {
        self.replicas.iter().map(|r| r.name().to_string()).collect()
    }
}

impl std::fmt::Debug for ReplicaSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Content-addressed storage backend.
///
/// Implementations are long-lived, shared behind an `Arc` and safe for
/// concurrent use.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Human-readable backend identifier used in logs.
    fn name(&self) -> &str;

    /// Store a blob and return its content id.
    async fn write(&self, content: Vec<u8>) -> MahutaResult<String>;

    /// Store a stream, consuming it fully, and return its content id.
    async fn write_stream(&self, content: ContentStream) -> MahutaResult<String>;

    /// Read a blob using the backend's configured deadline.
    ///
    /// # Errors
    ///
    /// [`MahutaError::NotFound`] for unknown ids, [`MahutaError::Timeout`]
    /// when the deadline elapses.
    async fn read(&self, content_id: &str) -> MahutaResult<Vec<u8>>;

    /// Read a blob with an explicit deadline.
    ///
    /// The default drops the in-flight read at the deadline. Backends that
    /// dispatch reads to a worker pool let the read run to completion instead.
    async fn read_with_timeout(&self, content_id: &str, timeout: Duration) -> MahutaResult<Vec<u8>> {
        match tokio::time::timeout(timeout, self.read(content_id)).await {
            Ok(result) => result,
            Err(_) => Err(MahutaError::Timeout(format!(
                "reading {content_id} from {} exceeded {timeout:?}",
                self.name()
            ))),
        }
    }

    /// Pin a content id on the primary backend.
    async fn pin(&self, content_id: &str) -> MahutaResult<()>;

    /// Unpin a content id on the primary backend.
    async fn unpin(&self, content_id: &str) -> MahutaResult<()>;

    /// Content ids pinned on the primary backend.
    async fn list_pinned(&self) -> MahutaResult<Vec<String>>;

    /// Pinning targets that receive a pin for every written content id.
    fn replica_set(&self) -> &ReplicaSet;

    /// Probe backend liveness. Never fails; failures are reported in the result.
    async fn check(&self) -> HealthCheck;
}
