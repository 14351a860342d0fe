//! # Pinning Strategy
//!
//! A pinning strategy makes content durable on one additional node or
//! service. The orchestration layer never branches on the concrete strategy.

use async_trait::async_trait;

use crate::error::MahutaResult;

/// One replication target.
///
/// `pin` and `unpin` are idempotent from the caller's point of view: pinning
/// an already-pinned id, or unpinning one that is not pinned, is not an error.
#[async_trait]
pub trait PinningStrategy: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &str;

    async fn pin(&self, content_id: &str) -> MahutaResult<()>;

    async fn unpin(&self, content_id: &str) -> MahutaResult<()>;

    /// Everything currently pinned through this strategy.
    async fn list_tracked(&self) -> MahutaResult<Vec<String>>;
}
