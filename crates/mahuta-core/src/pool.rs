//! # Bounded Worker Pool
//!
//! Tasks are spawned onto the tokio runtime but only `size` of them run at a
//! time. Two submission modes:
//!
//! - [`WorkerPool::run_with_deadline`]: submit and await with a deadline. On
//!   expiry the caller gets [`MahutaError::Timeout`] immediately while the
//!   task keeps running in the background.
//! - [`WorkerPool::fire_and_forget`]: submit and never observe the result;
//!   failures go to the log.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{MahutaError, MahutaResult};

/// Default number of concurrently running tasks.
pub const DEFAULT_POOL_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: Arc<str>,
    size: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(name: &str, size: usize) -> Self {
        let size = size.max(1);
        Self {
            name: Arc::from(name),
            size,
            permits: Arc::new(Semaphore::new(size)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of idle workers.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Spawn a task that waits for a free worker before running.
    pub fn spawn<F, T>(&self, task: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only waits.
            let _permit = permits.acquire_owned().await.ok();
            task.await
        })
    }

    /// Run `task` on the pool and wait at most `deadline` for its result.
    pub async fn run_with_deadline<F, T>(&self, label: &str, deadline: Duration, task: F) -> MahutaResult<T>
    where
        F: Future<Output = MahutaResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.spawn(task);
        match tokio::time::timeout(deadline, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(MahutaError::technical(
                format!("{label} did not complete"),
                join_err,
            )),
            Err(_) => {
                tracing::warn!(pool = %self.name, task = label, ?deadline, "task exceeded its deadline");
                Err(MahutaError::Timeout(format!("{label} exceeded {deadline:?}")))
            }
        }
    }

    /// Run `task` in the background. Errors are logged and discarded.
    pub fn fire_and_forget<F>(&self, label: String, task: F)
    where
        F: Future<Output = MahutaResult<()>> + Send + 'static,
    {
        let pool = Arc::clone(&self.name);
        self.spawn(async move {
            if let Err(err) = task.await {
                tracing::error!(
                    pool = %pool,
                    task = %label,
                    error = %err,
                    cause = err.cause().unwrap_or_default(),
                    "background task failed"
                );
            }
        });
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new("mahuta", DEFAULT_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn deadline_returns_result_when_fast() {
        let pool = WorkerPool::new("test", 2);
        let value = pool
            .run_with_deadline("fast", Duration::from_secs(1), async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn deadline_times_out_but_task_keeps_running() {
        let pool = WorkerPool::new("test", 2);
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);

        let result = pool
            .run_with_deadline("slow", Duration::from_millis(20), async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                d.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(MahutaError::Timeout(_))));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1, "task should finish after the deadline");
    }

    #[tokio::test]
    async fn propagates_task_error() {
        let pool = WorkerPool::new("test", 1);
        let result: MahutaResult<()> = pool
            .run_with_deadline("failing", Duration::from_secs(1), async {
                Err(MahutaError::not_found("Qm"))
            })
            .await;
        assert!(matches!(result, Err(MahutaError::NotFound(_))));
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let pool = WorkerPool::new("test", 2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn size_is_at_least_one() {
        assert_eq!(WorkerPool::new("x", 0).size(), 1);
    }

    #[tokio::test]
    async fn fire_and_forget_runs_task() {
        let pool = WorkerPool::new("test", 1);
        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.fire_and_forget("send".to_string(), async move {
            let _ = tx.send(());
            Ok(())
        });
        tokio::time::timeout(Duration::from_secs(1), rx).await.unwrap().unwrap();
    }
}
