//! # Pinning Reconciler
//!
//! Background task that repairs replication gaps. On every tick it walks each
//! index for documents whose `__pinned` flag is still `false`, pins their
//! content on every replica, and flips the flag once all replicas succeed.
//! Failures are logged and retried on the next tick; the tick period is the
//! only backoff.
//!
//! ## Lifecycle
//!
//! ```ignore
//! let reconciler = Arc::new(PinningReconciler::new(&service, Duration::from_secs(30)));
//! reconciler.start();          // first tick runs immediately
//! // ...
//! reconciler.stop().await;     // waits for the current tick to finish
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::Metadata;
use crate::error::MahutaResult;
use crate::indexing::{IndexingService, PINNED_INDEX_KEY};
use crate::page::PageRequest;
use crate::query::Query;
use crate::service::{pin_on_replicas, MahutaService};
use crate::storage::StorageService;

/// Documents fetched per search page.
pub const RECONCILER_PAGE_SIZE: usize = 50;

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub indices: usize,
    pub scanned: usize,
    pub pinned: usize,
    pub failed: usize,
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct PinningReconciler {
    storage: Arc<dyn StorageService>,
    indexer: Arc<dyn IndexingService>,
    period: Duration,
    page_size: usize,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for PinningReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinningReconciler")
            .field("period", &self.period)
            .field("page_size", &self.page_size)
            .field("running", &self.is_running())
            .finish()
    }
}

impl PinningReconciler {
    pub fn new(service: &MahutaService, period: Duration) -> Self {
        Self {
            storage: Arc::clone(service.storage()),
            indexer: Arc::clone(service.indexer()),
            period,
            page_size: RECONCILER_PAGE_SIZE,
            running: Mutex::new(None),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Start ticking. Calling `start` on a running reconciler does nothing.
    pub fn start(self: &Arc<Self>) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return;
        }
        let (shutdown, mut stop) = watch::channel(false);
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = this.run_once().await;
                        tracing::debug!(?report, "reconciliation pass finished");
                    }
                    _ = stop.changed() => break,
                }
            }
            tracing::info!("pinning reconciler stopped");
        });
        tracing::info!(period = ?self.period, "pinning reconciler started");
        *running = Some(Running { shutdown, handle });
    }

    /// Stop ticking and wait for an in-flight pass to complete.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(Running { shutdown, handle }) = running {
            let _ = shutdown.send(true);
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "pinning reconciler task failed");
            }
        }
    }

    /// One full pass over every index.
    pub async fn run_once(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let indexes = match self.indexer.get_indexes().await {
            Ok(indexes) => indexes,
            Err(err) => {
                tracing::error!(error = %err, "reconciler could not list indices");
                return report;
            }
        };

        for index_name in indexes {
            report.indices += 1;
            if let Err(err) = self.reconcile_index(&index_name, &mut report).await {
                tracing::error!(index = %index_name, error = %err, "reconciler search failed");
            }
        }
        report
    }

    /// Reconcile an index page by page.
    ///
    /// Pinned documents drop out of the `__pinned = false` result, so a page
    /// that pinned anything is queried again at the same position. A page
    /// whose documents all failed is stepped over. Each document is attempted
    /// at most once per pass.
    async fn reconcile_index(&self, index_name: &str, report: &mut ReconcileReport) -> MahutaResult<()> {
        let query = Query::new().equals(PINNED_INDEX_KEY, false);
        let mut request = PageRequest::of(0, self.page_size)?;
        let mut attempted = HashSet::new();
        loop {
            let page = self
                .indexer
                .search_documents(Some(index_name), &query, &request)
                .await?;
            if page.elements().is_empty() {
                return Ok(());
            }
            let last = page.is_last();
            let next = page.next_page_request();

            let mut fresh = 0;
            let mut pinned = 0;
            for metadata in page.into_elements() {
                if !attempted.insert(metadata.index_doc_id.clone()) {
                    continue;
                }
                fresh += 1;
                report.scanned += 1;
                if self.reconcile(&metadata).await {
                    pinned += 1;
                    report.pinned += 1;
                } else {
                    report.failed += 1;
                }
            }

            if fresh == 0 || pinned == 0 {
                if last {
                    return Ok(());
                }
                request = next;
            }
        }
    }

    async fn reconcile(&self, metadata: &Metadata) -> bool {
        let Some(content_id) = metadata.content_id() else {
            tracing::debug!(index = %metadata.index_name, id = %metadata.index_doc_id, "document has no content id, skipping");
            return false;
        };
        if !pin_on_replicas(self.storage.replica_set(), content_id).await {
            return false;
        }
        match self
            .indexer
            .update_field(&metadata.index_name, &metadata.index_doc_id, PINNED_INDEX_KEY, Value::Bool(true))
            .await
        {
            Ok(()) => {
                tracing::debug!(index = %metadata.index_name, id = %metadata.index_doc_id, content_id, "document pinned");
                true
            }
            Err(err) => {
                tracing::warn!(index = %metadata.index_name, id = %metadata.index_doc_id, error = %err, "unable to flag document as pinned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateIndexRequest, IndexingRequest};
    use crate::memory::{MemoryIndexer, MemoryPinning, MemoryStorage};
    use crate::pinning::PinningStrategy;

    #[tokio::test]
    async fn run_once_flags_every_page() {
        let pin = Arc::new(MemoryPinning::new("replica"));
        let storage = Arc::new(MemoryStorage::new().with_replica(pin.clone()));
        let indexer = Arc::new(MemoryIndexer::new());
        indexer.create_index("docs", None).await.unwrap();
        for i in 0..7 {
            indexer
                .index("docs", None, Some(&format!("cid-{i}")), None, &Default::default())
                .await
                .unwrap();
        }
        let service = MahutaService::new(storage, indexer.clone());
        let reconciler = PinningReconciler::new(&service, Duration::from_secs(60)).with_page_size(3);

        let report = reconciler.run_once().await;
        assert_eq!(report, ReconcileReport { indices: 1, scanned: 7, pinned: 7, failed: 0 });
        assert_eq!(pin.list_tracked().await.unwrap().len(), 7);

        let second = reconciler.run_once().await;
        assert_eq!(second.scanned, 0);
    }

    /// Replica refusing a fixed set of content ids.
    struct RefusingPinning {
        refused: Vec<String>,
        tracked: MemoryPinning,
    }

    #[async_trait::async_trait]
    impl PinningStrategy for RefusingPinning {
        fn name(&self) -> &str {
            "refusing"
        }

        async fn pin(&self, content_id: &str) -> crate::MahutaResult<()> {
            if self.refused.iter().any(|c| c == content_id) {
                return Err(crate::MahutaError::technical_msg(format!("refused {content_id}")));
            }
            self.tracked.pin(content_id).await
        }

        async fn unpin(&self, content_id: &str) -> crate::MahutaResult<()> {
            self.tracked.unpin(content_id).await
        }

        async fn list_tracked(&self) -> crate::MahutaResult<Vec<String>> {
            self.tracked.list_tracked().await
        }
    }

    #[tokio::test]
    async fn failures_are_stepped_over_and_attempted_once_per_pass() {
        let replica = Arc::new(RefusingPinning {
            refused: vec!["cid-0".into(), "cid-1".into(), "cid-2".into()],
            tracked: MemoryPinning::new("tracked"),
        });
        let storage = Arc::new(MemoryStorage::new().with_replica(replica.clone()));
        let indexer = Arc::new(MemoryIndexer::new());
        indexer.create_index("docs", None).await.unwrap();
        for i in 0..7 {
            indexer
                .index("docs", Some(&format!("doc-{i}")), Some(&format!("cid-{i}")), None, &Default::default())
                .await
                .unwrap();
        }
        let service = MahutaService::new(storage, indexer);
        let reconciler = PinningReconciler::new(&service, Duration::from_secs(60)).with_page_size(2);

        let report = reconciler.run_once().await;
        assert_eq!(report, ReconcileReport { indices: 1, scanned: 7, pinned: 4, failed: 3 });
        assert_eq!(replica.list_tracked().await.unwrap().len(), 4);

        let retry = reconciler.run_once().await;
        assert_eq!(retry, ReconcileReport { indices: 1, scanned: 3, pinned: 0, failed: 3 });
    }

    #[tokio::test]
    async fn start_and_stop() {
        let service = MahutaService::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryIndexer::new()));
        service.create_index(CreateIndexRequest::new("docs")).await.unwrap();
        service.index(IndexingRequest::text("docs", "x")).await.unwrap();

        let reconciler = Arc::new(PinningReconciler::new(&service, Duration::from_millis(10)));
        reconciler.start();
        reconciler.start();
        assert!(reconciler.is_running());
        tokio::time::sleep(Duration::from_millis(50)).await;
        reconciler.stop().await;
        assert!(!reconciler.is_running());
    }
}
