//! Project repository functions. Projects sit at the top of the
//! cascade-delete chain: Project → Executions → NodeExecutions.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::ProjectRow, DbError};

pub async fn create_project(pool: &PgPool, name: &str) -> Result<ProjectRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as::<_, ProjectRow>(
        "INSERT INTO projects (id, name, created_at) VALUES ($1, $2, $3)
         RETURNING id, name, created_at",
    )
    .bind(id)
    .bind(name)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_project(pool: &PgPool, id: Uuid) -> Result<ProjectRow, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>("SELECT id, name, created_at FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    Ok(row)
}

pub async fn list_projects(pool: &PgPool) -> Result<Vec<ProjectRow>, DbError> {
    let rows = sqlx::query_as::<_, ProjectRow>("SELECT id, name, created_at FROM projects ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Delete a project. `ON DELETE CASCADE` on `workflow_executions.project_id`
/// (and transitively `node_executions.execution_id`) takes care of the rest.
pub async fn delete_project(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1").bind(id).execute(pool).await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
