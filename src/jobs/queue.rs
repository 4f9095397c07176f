/*!
 * FIFO queue of pending job IDs with a bounded blocking pop.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::database::Repository;

/// Longest sleep between two looks at the table; covers pushes made by
/// another process sharing the database file
const RECHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Job ID queue stored next to the job ledger
#[derive(Clone, Debug)]
pub struct JobQueue {
    repo: Repository,
    notify: Arc<Notify>,
}

impl JobQueue {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Append a job ID and wake one waiting consumer
    pub async fn push(&self, job_id: &str) -> Result<()> {
        self.repo.enqueue(job_id).await?;
        self.notify.notify_one();
        Ok(())
    }

    /// Take the oldest job ID, waiting at most `timeout` for one to arrive
    pub async fn pop(&self, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(job_id) = self.repo.dequeue().await? {
                return Ok(Some(job_id));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let wait = (deadline - now).min(RECHECK_INTERVAL);
            // Woken early by a push, or re-check after the interval
            let _ = tokio::time::timeout(wait, self.notify.notified()).await;
        }
    }

    /// Number of queued job IDs
    pub async fn len(&self) -> Result<usize> {
        self.repo.queue_len().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
