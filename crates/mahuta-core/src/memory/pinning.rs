use async_trait::async_trait;
use dashmap::DashSet;

use crate::error::MahutaResult;
use crate::pinning::PinningStrategy;

/// Pinning strategy that records pinned ids in a concurrent set.
#[derive(Debug)]
pub struct MemoryPinning {
    name: String,
    tracked: DashSet<String>,
}

impl MemoryPinning {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracked: DashSet::new(),
        }
    }

    pub fn is_tracked(&self, content_id: &str) -> bool {
        self.tracked.contains(content_id)
    }
}

#[async_trait]
impl PinningStrategy for MemoryPinning {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pin(&self, content_id: &str) -> MahutaResult<()> {
        self.tracked.insert(content_id.to_string());
        tracing::debug!(strategy = %self.name, content_id, "pinned");
        Ok(())
    }

    async fn unpin(&self, content_id: &str) -> MahutaResult<()> {
        self.tracked.remove(content_id);
        tracing::debug!(strategy = %self.name, content_id, "unpinned");
        Ok(())
    }

    async fn list_tracked(&self) -> MahutaResult<Vec<String>> {
        let mut ids: Vec<String> = self.tracked.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
