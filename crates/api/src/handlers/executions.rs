use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use db::repository::workflows as wf_repo;
use queue::FlowJob;
use serde_json::Value;
use uuid::Uuid;

use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct ExecuteWorkflowDto {
    pub project_id: Uuid,
    #[serde(default)]
    pub input: Value,
}

/// Submit a stored workflow for execution. Enqueues a `FlowJob` onto the
/// flow-queue rather than running it inline — a flow worker picks it up
/// and drives the actual `FlowExecutor`.
pub async fn execute(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ExecuteWorkflowDto>,
) -> Result<(StatusCode, Json<db::models::JobRow>), StatusCode> {
    let wf = match wf_repo::get_workflow(&state.pool, id).await {
        Ok(wf) => wf,
        Err(db::DbError::NotFound) => return Err(StatusCode::NOT_FOUND),
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    // Each submission gets its own flow_id, independent of the stored
    // workflow's own id, so hook routing and room membership never
    // collide across concurrent runs of the same workflow.
    let flow_job = FlowJob {
        flow_id: Uuid::new_v4(),
        workflow_id: id,
        project_id: payload.project_id,
        flow: wf.definition,
        options: serde_json::json!({ "input": payload.input }),
        priority: None,
        delay: None,
    };

    state.queue.add_flow(flow_job).await.map(|job| (StatusCode::ACCEPTED, Json(job))).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Live status if a run is currently in memory, else the persisted row.
pub async fn get(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if let Some(executor) = state.executors.get(id).await {
        let live = executor.get_state().await;
        return Ok(Json(serde_json::to_value(live).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?));
    }

    match db::repository::executions::get_execution(&state.pool, id).await {
        Ok(row) => Ok(Json(serde_json::to_value(row).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?)),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn pause(Path(id): Path<Uuid>, State(state): State<AppState>) -> StatusCode {
    control(&state, id, Control::Pause).await
}

pub async fn resume(Path(id): Path<Uuid>, State(state): State<AppState>) -> StatusCode {
    control(&state, id, Control::Resume).await
}

pub async fn abort(Path(id): Path<Uuid>, State(state): State<AppState>) -> StatusCode {
    control(&state, id, Control::Abort).await
}

enum Control {
    Pause,
    Resume,
    Abort,
}

async fn control(state: &AppState, execution_id: Uuid, action: Control) -> StatusCode {
    let Some(executor) = state.executors.get(execution_id).await else {
        return StatusCode::NOT_FOUND;
    };

    let result = match action {
        Control::Pause => executor.pause().await,
        Control::Resume => executor.resume().await,
        Control::Abort => executor.abort().await,
    };

    match result {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
