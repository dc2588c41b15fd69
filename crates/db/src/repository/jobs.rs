//! Job queue repository functions.
//!
//! The queue is backed by the `job_queue` Postgres table, shared by both
//! the flow-queue and node-queue (distinguished by the `queue` column).
//! Workers poll the table and use `SELECT … FOR UPDATE SKIP LOCKED` for
//! safe concurrent processing.

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::JobRow, DbError};

/// Enqueue a new job for the given execution onto `queue` ("flow" or
/// "node"). `payload` is arbitrary JSON the worker hands back to the engine.
/// `delay` pushes `available_at` into the future; `priority` breaks ties
/// within a queue (higher runs first).
#[allow(clippy::too_many_arguments)]
pub async fn enqueue_job(
    pool: &PgPool,
    queue: &str,
    execution_id: Uuid,
    workflow_id: Uuid,
    max_attempts: i32,
    priority: i32,
    delay: Option<std::time::Duration>,
    payload: serde_json::Value,
) -> Result<JobRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let available_at = delay.map(|d| now + ChronoDuration::from_std(d).unwrap_or_default()).unwrap_or(now);

    let row = sqlx::query_as::<_, JobRow>(
        "INSERT INTO job_queue
            (id, queue, execution_id, workflow_id, status, priority, attempts, max_attempts, payload, available_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, 'pending', $5, 0, $6, $7, $8, $9, $9)
         RETURNING id, queue, execution_id, workflow_id, status, priority, attempts, max_attempts, payload, available_at, created_at, updated_at",
    )
    .bind(id)
    .bind(queue)
    .bind(execution_id)
    .bind(workflow_id)
    .bind(priority)
    .bind(max_attempts)
    .bind(payload)
    .bind(available_at)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Atomically fetch the highest-priority, oldest-available pending job on
/// `queue` and mark it `processing`.
///
/// Uses `SELECT … FOR UPDATE SKIP LOCKED` so multiple workers can poll
/// safely without stepping on each other. Returns `None` if no job is
/// currently eligible (pending and past its `available_at`).
pub async fn fetch_next_job(pool: &PgPool, queue: &str) -> Result<Option<JobRow>, DbError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let row = sqlx::query_as::<_, JobRow>(
        "SELECT id, queue, execution_id, workflow_id, status, priority, attempts, max_attempts, payload, available_at, created_at, updated_at
         FROM job_queue
         WHERE status = 'pending' AND queue = $1 AND available_at <= $2
         ORDER BY priority DESC, created_at ASC
         LIMIT 1
         FOR UPDATE SKIP LOCKED",
    )
    .bind(queue)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(ref job) = row {
        sqlx::query("UPDATE job_queue SET status = 'processing', attempts = attempts + 1, updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(job.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    } else {
        tx.rollback().await?;
    }

    Ok(row)
}

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<JobRow, DbError> {
    let row = sqlx::query_as::<_, JobRow>(
        "SELECT id, queue, execution_id, workflow_id, status, priority, attempts, max_attempts, payload, available_at, created_at, updated_at
         FROM job_queue WHERE id = $1",
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Mark a job as completed.
pub async fn complete_job(pool: &PgPool, job_id: Uuid) -> Result<(), DbError> {
    sqlx::query("UPDATE job_queue SET status = 'completed', updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark a job as failed. If `attempts < max_attempts` it goes back to
/// `pending` with `available_at` pushed out by `backoff`; otherwise it is
/// dead-lettered.
pub async fn fail_job(pool: &PgPool, job_id: Uuid, max_attempts: i32, backoff: std::time::Duration) -> Result<(), DbError> {
    let now = Utc::now();
    let next_available = now + ChronoDuration::from_std(backoff).unwrap_or_default();

    sqlx::query(
        "UPDATE job_queue
         SET status = CASE WHEN attempts >= $1 THEN 'dead_lettered' ELSE 'pending' END,
             available_at = CASE WHEN attempts >= $1 THEN available_at ELSE $2 END,
             updated_at = $3
         WHERE id = $4",
    )
    .bind(max_attempts)
    .bind(next_available)
    .bind(now)
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Force a job back to `pending` immediately, regardless of its current
/// attempt count (explicit operator-driven `retry`, distinct from the
/// worker's automatic [`fail_job`] requeue path).
pub async fn requeue_job(pool: &PgPool, job_id: Uuid) -> Result<JobRow, DbError> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, JobRow>(
        "UPDATE job_queue SET status = 'pending', available_at = $1, updated_at = $1 WHERE id = $2
         RETURNING id, queue, execution_id, workflow_id, status, priority, attempts, max_attempts, payload, available_at, created_at, updated_at",
    )
    .bind(now)
    .bind(job_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row)
}

/// Remove a job outright (used by the `remove` queue operation).
pub async fn remove_job(pool: &PgPool, job_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM job_queue WHERE id = $1").bind(job_id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Delete every pending job on `queue` (used by the `clear` queue operation).
/// Jobs already `processing` are left alone so in-flight work isn't orphaned.
pub async fn clear_pending(pool: &PgPool, queue: &str) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM job_queue WHERE queue = $1 AND status = 'pending'").bind(queue).execute(pool).await?;
    Ok(result.rows_affected())
}

/// Per-queue counters for health probes: (waiting, active, completed, failed).
pub async fn queue_counts(pool: &PgPool, queue: &str) -> Result<(i64, i64, i64, i64), DbError> {
    let row: (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT
            COUNT(*) FILTER (WHERE status = 'pending') AS waiting,
            COUNT(*) FILTER (WHERE status = 'processing') AS active,
            COUNT(*) FILTER (WHERE status = 'completed') AS completed,
            COUNT(*) FILTER (WHERE status IN ('failed', 'dead_lettered')) AS failed
         FROM job_queue WHERE queue = $1",
    )
    .bind(queue)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
