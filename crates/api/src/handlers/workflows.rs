use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use db::repository::workflows as wf_repo;
use resolver::{DependencyResolver, GraphEdge, GraphNode};
use serde_json::Value;
use uuid::Uuid;

use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct CreateWorkflowDto {
    pub name: String,
    pub definition: Value,
}

/// Deserialize `definition` as an `engine::Flow` and reject it at creation
/// time if its graph is malformed or cyclic, rather than discovering that
/// on the first execution attempt.
fn validate_flow(definition: &Value) -> Result<engine::Flow, StatusCode> {
    let flow: engine::Flow = serde_json::from_value(definition.clone()).map_err(|_| StatusCode::BAD_REQUEST)?;

    let nodes: Vec<GraphNode> = flow.nodes.iter().map(|n| GraphNode { id: n.id.clone() }).collect();
    let edges: Vec<GraphEdge> = flow
        .edges
        .iter()
        .map(|e| GraphEdge { id: e.edge_id.clone(), from: e.source_node_id.clone(), to: e.target_node_id.clone() })
        .collect();

    let resolver = DependencyResolver::new(&nodes, &edges).map_err(|_| StatusCode::BAD_REQUEST)?;
    resolver.execution_plan().map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(flow)
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<db::models::WorkflowRow>>, StatusCode> {
    wf_repo::list_workflows(&state.pool).await.map(Json).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn get(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<db::models::WorkflowRow>, StatusCode> {
    match wf_repo::get_workflow(&state.pool, id).await {
        Ok(wf) => Ok(Json(wf)),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkflowDto>,
) -> Result<(StatusCode, Json<db::models::WorkflowRow>), StatusCode> {
    validate_flow(&payload.definition)?;

    wf_repo::create_workflow(&state.pool, &payload.name, payload.definition)
        .await
        .map(|wf| (StatusCode::CREATED, Json(wf)))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn delete(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    match wf_repo::delete_workflow(&state.pool, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Return the layered execution plan for a stored flow without running it.
pub async fn plan(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<resolver::ExecutionPlan>, StatusCode> {
    let wf = match wf_repo::get_workflow(&state.pool, id).await {
        Ok(wf) => wf,
        Err(db::DbError::NotFound) => return Err(StatusCode::NOT_FOUND),
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let flow = validate_flow(&wf.definition)?;
    let nodes: Vec<GraphNode> = flow.nodes.iter().map(|n| GraphNode { id: n.id.clone() }).collect();
    let edges: Vec<GraphEdge> = flow
        .edges
        .iter()
        .map(|e| GraphEdge { id: e.edge_id.clone(), from: e.source_node_id.clone(), to: e.target_node_id.clone() })
        .collect();
    let resolver = DependencyResolver::new(&nodes, &edges).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let plan = resolver.execution_plan().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(plan))
}
