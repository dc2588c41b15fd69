//! Worker pools that poll a [`JobQueue`] and hand claimed jobs to a
//! [`JobProcessor`].
//!
//! The flow-queue and node-queue each get their own pool so a flood of node
//! dispatches can never starve flow submissions (or vice versa); the spec
//! constraint that the flow-queue's concurrency stay ≤ the node-queue's is
//! enforced by the caller choosing `concurrency` when building each pool,
//! not by anything in here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use db::models::{JobRow, QueueKind};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::queue::JobQueue;

/// Implemented by whoever actually moves a job forward — the `api`/`cli`
/// wiring layer hands the queue a processor backed by the engine's
/// `FlowExecutor` and `OrchestratorRegistry`.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: JobRow) -> Result<(), String>;
}

/// Polls one queue kind and dispatches claimed jobs to a [`JobProcessor`],
/// bounding in-flight work to `concurrency` permits.
pub struct Worker<P: JobProcessor> {
    queue: Arc<JobQueue>,
    kind: QueueKind,
    processor: Arc<P>,
    concurrency: usize,
    poll_interval: Duration,
}

impl<P: JobProcessor + 'static> Worker<P> {
    pub fn new(queue: Arc<JobQueue>, kind: QueueKind, processor: Arc<P>, concurrency: usize) -> Self {
        Self { queue, kind, processor, concurrency, poll_interval: Duration::from_millis(250) }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run forever, polling for eligible jobs and spawning a task per claim
    /// up to `concurrency`. Returns only if the queue itself errors in a
    /// way that isn't a simple "no jobs right now".
    pub async fn run(self) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        info!(queue = ?self.kind, concurrency = self.concurrency, "worker pool starting");

        loop {
            if !self.queue.is_running(self.kind) {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let job = match self.queue.fetch_next(self.kind).await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    drop(permit);
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
                Err(e) => {
                    drop(permit);
                    error!(queue = ?self.kind, error = %e, "failed to poll queue");
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
            };

            let queue = self.queue.clone();
            let processor = self.processor.clone();
            let kind = self.kind;

            tokio::spawn(async move {
                let _permit = permit;
                let job_id = job.id;
                match processor.process(job.clone()).await {
                    Ok(()) => {
                        if let Err(e) = queue.complete(job_id).await {
                            warn!(%job_id, error = %e, "failed to mark job completed");
                        }
                    }
                    Err(message) => {
                        warn!(%job_id, attempts = job.attempts, error = %message, "job attempt failed");
                        if let Err(e) = queue.fail(&job, kind).await {
                            warn!(%job_id, error = %e, "failed to record job failure");
                        }
                    }
                }
            });
        }
    }
}
