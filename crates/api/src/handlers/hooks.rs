//! HTTP surface for the hook ingress: the four callback paths agent
//! subprocesses post to, plus the review-feedback callback a human (or
//! review tool) posts back.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use hooks::{AgentCompleteBody, AgentErrorBody, CheckpointBody, FileChangedBody, ReviewAction, ReviewCallbackBody};
use review::{ReviewDecision, ReviewFeedback, Severity};
use uuid::Uuid;

use crate::state::AppState;

pub async fn agent_complete(State(state): State<AppState>, Json(body): Json<AgentCompleteBody>) -> StatusCode {
    match state.hooks.agent_complete(body) {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::BAD_REQUEST,
    }
}

pub async fn file_changed(State(state): State<AppState>, Json(body): Json<FileChangedBody>) -> StatusCode {
    state.hooks.file_changed(body);
    StatusCode::OK
}

pub async fn agent_error(State(state): State<AppState>, Json(body): Json<AgentErrorBody>) -> StatusCode {
    state.hooks.agent_error(body);
    StatusCode::OK
}

pub async fn checkpoint(State(state): State<AppState>, Json(body): Json<CheckpointBody>) -> StatusCode {
    state.hooks.checkpoint(body);
    StatusCode::OK
}

/// `POST /review/{node_id}` — a reviewer's decision on a node suspended
/// for review. Addressed by `node_id`, same as the other hook paths;
/// resolved to the flow (and in turn the executor) through the shared
/// routing table.
pub async fn review(
    Path(node_id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<ReviewCallbackBody>,
) -> StatusCode {
    let Some(flow_id) = state.registry.routes().flow_for_node(&node_id) else {
        return StatusCode::NOT_FOUND;
    };
    let Some(executor) = state.executors.find_by_flow(flow_id).await else {
        return StatusCode::NOT_FOUND;
    };

    let decision = match body.action {
        ReviewAction::Approve => ReviewDecision::Approve,
        ReviewAction::Reject => ReviewDecision::Reject,
        ReviewAction::RequestChanges => ReviewDecision::RequestChanges,
    };

    let reviewer_id = headers.get("x-reviewer-id").and_then(|v| v.to_str().ok()).unwrap_or("anonymous").to_string();

    // `modifications` is free-form JSON from the reviewer's tool; the
    // coordinator's action_items only understand a flat list of strings,
    // so anything else is dropped rather than guessed at.
    let action_items = match &body.modifications {
        Some(serde_json::Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    };

    let feedback = ReviewFeedback {
        feedback_id: Uuid::new_v4(),
        node_id,
        reviewer_id,
        decision,
        comments: body.feedback,
        action_items,
        severity: Severity::Info,
        timestamp: Utc::now(),
    };

    match executor.submit_review_feedback(feedback).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::BAD_REQUEST,
    }
}
