//! `JobQueue` — the durable flow-queue/node-queue pair, backed by the
//! `job_queue` Postgres table via [`db::repository::jobs`].

use db::models::{JobRow, QueueKind};
use db::DbPool;
use retry::backoff::{apply_jitter, raw_delay};
use uuid::Uuid;

use crate::control::QueueControl;
use crate::error::QueueError;
use crate::job::{default_backoff, default_max_attempts, queue_name, FlowJob, NodeJob};

/// Per-queue snapshot counters for health probes.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct QueueCounts {
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Durable two-queue job broker. Cheap to clone (wraps a pool handle and
/// an `Arc`-free control table — clone the pool, share the control table
/// behind an `Arc` at the call site if multiple workers need it).
pub struct JobQueue {
    pool: DbPool,
    control: QueueControl,
}

impl JobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, control: QueueControl::new() }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Enqueue a flow for execution. `attempts=3`, 2s exponential backoff
    /// base, persisted on completion for audit.
    pub async fn add_flow(&self, job: FlowJob) -> Result<JobRow, QueueError> {
        let payload = serde_json::to_value(&job).map_err(|e| QueueError::Serialization(e.to_string()))?;
        let row = db::repository::jobs::enqueue_job(
            &self.pool,
            queue_name(QueueKind::Flow),
            job.flow_id,
            job.workflow_id,
            default_max_attempts(QueueKind::Flow),
            job.priority.unwrap_or(0),
            job.delay,
            payload,
        )
        .await?;
        Ok(row)
    }

    /// Enqueue a single node dispatch. `attempts = max_attempts` from the
    /// node's own retry config, 1s exponential backoff base.
    pub async fn add_node(&self, workflow_id: Uuid, job: NodeJob) -> Result<JobRow, QueueError> {
        let max_attempts = job.max_attempts as i32;
        let payload = serde_json::to_value(&job).map_err(|e| QueueError::Serialization(e.to_string()))?;
        let row = db::repository::jobs::enqueue_job(
            &self.pool,
            queue_name(QueueKind::Node),
            job.flow_id,
            workflow_id,
            max_attempts,
            0,
            None,
            payload,
        )
        .await?;
        Ok(row)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<JobRow, QueueError> {
        db::repository::jobs::get_job(&self.pool, job_id).await.map_err(|e| match e {
            db::DbError::NotFound => QueueError::NotFound(job_id),
            other => QueueError::Db(other),
        })
    }

    /// Force a job back to `pending` immediately, bypassing its attempt
    /// budget. Used by operators retrying a dead-lettered job by hand.
    pub async fn retry(&self, job_id: Uuid) -> Result<JobRow, QueueError> {
        let row = db::repository::jobs::requeue_job(&self.pool, job_id).await?;
        Ok(row)
    }

    pub async fn remove(&self, job_id: Uuid) -> Result<(), QueueError> {
        db::repository::jobs::remove_job(&self.pool, job_id).await?;
        Ok(())
    }

    pub fn pause(&self, kind: QueueKind) {
        self.control.pause(kind);
    }

    pub fn resume(&self, kind: QueueKind) {
        self.control.resume(kind);
    }

    pub fn is_running(&self, kind: QueueKind) -> bool {
        self.control.is_running(kind)
    }

    pub(crate) fn control(&self) -> &QueueControl {
        &self.control
    }

    /// Drop every still-pending job on `kind`'s queue. In-flight
    /// (`processing`) jobs are left to finish.
    pub async fn clear(&self, kind: QueueKind) -> Result<u64, QueueError> {
        let removed = db::repository::jobs::clear_pending(&self.pool, queue_name(kind)).await?;
        Ok(removed)
    }

    pub async fn counts(&self, kind: QueueKind) -> Result<QueueCounts, QueueError> {
        let (waiting, active, completed, failed) = db::repository::jobs::queue_counts(&self.pool, queue_name(kind)).await?;
        Ok(QueueCounts { waiting, active, completed, failed })
    }

    /// Atomically claim the next eligible job on `kind`'s queue.
    pub(crate) async fn fetch_next(&self, kind: QueueKind) -> Result<Option<JobRow>, QueueError> {
        let row = db::repository::jobs::fetch_next_job(&self.pool, queue_name(kind)).await?;
        Ok(row)
    }

    /// Complete a job after successful processing.
    pub(crate) async fn complete(&self, job_id: Uuid) -> Result<(), QueueError> {
        db::repository::jobs::complete_job(&self.pool, job_id).await?;
        Ok(())
    }

    /// Fail a job's current attempt, computing the next backoff delay from
    /// the queue kind's default policy and the row's own attempt count.
    pub(crate) async fn fail(&self, job: &JobRow, kind: QueueKind) -> Result<(), QueueError> {
        let config = default_backoff(kind);
        let delay = apply_jitter(&config, raw_delay(&config, job.attempts.max(1) as u32, None));
        db::repository::jobs::fail_job(&self.pool, job.id, job.max_attempts, delay).await?;
        Ok(())
    }
}
