//! Execution and node-execution repository functions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{NodeExecutionRow, WorkflowExecutionRow},
    DbError,
};

// ---------------------------------------------------------------------------
// workflow_executions
// ---------------------------------------------------------------------------

/// Create a new flow execution record in `initializing` status.
///
/// `id` is supplied by the caller rather than generated here so it can
/// match the in-memory `FlowExecutor`'s own `execution_id`, keeping the
/// audit row and the live run correlated.
pub async fn create_execution(
    pool: &PgPool,
    id: Uuid,
    project_id: Uuid,
    workflow_id: Uuid,
    flow_snapshot: serde_json::Value,
) -> Result<WorkflowExecutionRow, DbError> {
    let now = Utc::now();

    let row = sqlx::query_as::<_, WorkflowExecutionRow>(
        "INSERT INTO workflow_executions (id, project_id, workflow_id, flow_snapshot, status, started_at)
         VALUES ($1, $2, $3, $4, 'initializing', $5)
         RETURNING id, project_id, workflow_id, flow_snapshot, status, started_at, finished_at",
    )
    .bind(id)
    .bind(project_id)
    .bind(workflow_id)
    .bind(flow_snapshot)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_execution(pool: &PgPool, execution_id: Uuid) -> Result<WorkflowExecutionRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowExecutionRow>(
        "SELECT id, project_id, workflow_id, flow_snapshot, status, started_at, finished_at
         FROM workflow_executions WHERE id = $1",
    )
    .bind(execution_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Update the `status` (and optionally `finished_at`) of a flow execution.
pub async fn update_execution_status(pool: &PgPool, execution_id: Uuid, status: &str, finished: bool) -> Result<(), DbError> {
    if finished {
        sqlx::query("UPDATE workflow_executions SET status = $1, finished_at = $2 WHERE id = $3")
            .bind(status)
            .bind(Utc::now())
            .bind(execution_id)
            .execute(pool)
            .await?;
    } else {
        sqlx::query("UPDATE workflow_executions SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(execution_id)
            .execute(pool)
            .await?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// node_executions
// ---------------------------------------------------------------------------

/// Insert a node execution attempt record, in `running` status.
pub async fn insert_node_execution(
    pool: &PgPool,
    execution_id: Uuid,
    node_id: &str,
    attempt: i32,
    instance_id: Option<Uuid>,
    input: serde_json::Value,
    started_at: DateTime<Utc>,
) -> Result<NodeExecutionRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as::<_, NodeExecutionRow>(
        "INSERT INTO node_executions
            (id, execution_id, node_id, attempt, instance_id, input, output, status, error, started_at, finished_at)
         VALUES ($1, $2, $3, $4, $5, $6, NULL, 'running', NULL, $7, NULL)
         RETURNING id, execution_id, node_id, attempt, instance_id, input, output, status, error, started_at, finished_at",
    )
    .bind(id)
    .bind(execution_id)
    .bind(node_id)
    .bind(attempt)
    .bind(instance_id)
    .bind(input)
    .bind(started_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Finalize a node execution attempt with its terminal status.
pub async fn finish_node_execution(
    pool: &PgPool,
    id: Uuid,
    status: &str,
    output: Option<serde_json::Value>,
    error: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query("UPDATE node_executions SET status = $1, output = $2, error = $3, finished_at = $4 WHERE id = $5")
        .bind(status)
        .bind(output)
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn list_node_executions(pool: &PgPool, execution_id: Uuid) -> Result<Vec<NodeExecutionRow>, DbError> {
    let rows = sqlx::query_as::<_, NodeExecutionRow>(
        "SELECT id, execution_id, node_id, attempt, instance_id, input, output, status, error, started_at, finished_at
         FROM node_executions WHERE execution_id = $1 ORDER BY started_at ASC",
    )
    .bind(execution_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
