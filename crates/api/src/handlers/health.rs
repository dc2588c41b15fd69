use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let flow_counts = state.queue.counts(queue::QueueKind::Flow).await.ok();
    let node_counts = state.queue.counts(queue::QueueKind::Node).await.ok();

    Json(json!({
        "status": "ok",
        "queues": {
            "flow": flow_counts,
            "node": node_counts,
        },
    }))
}
