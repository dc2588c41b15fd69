//! Wire bodies posted by agent subprocesses to the four hook paths, plus
//! the review-feedback body posted to `/review/{node_id}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentCompleteBody {
    pub node_id: String,
    pub status: String,
    pub output: Value,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileChangedBody {
    pub node_id: String,
    pub files: Vec<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentErrorBody {
    pub node_id: String,
    pub error: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointBody {
    pub node_id: String,
    pub name: String,
    pub data: Value,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewAction {
    Approve,
    Reject,
    RequestChanges,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewCallbackBody {
    pub action: ReviewAction,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub modifications: Option<Value>,
}
