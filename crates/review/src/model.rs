//! Data types for the review coordinator's state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewScope {
    Full,
    Changes,
    Specific,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub node_id: String,
    pub flow_id: Uuid,
    pub scope: ReviewScope,
    #[serde(default)]
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub criteria: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    pub requires_approval: bool,
    #[serde(default = "default_required_approvals")]
    pub required_approvals: u32,
    #[serde(default)]
    pub metadata: Value,
    pub opened_at: DateTime<Utc>,
}

fn default_required_approvals() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewDecision {
    Approve,
    Reject,
    RequestChanges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFeedback {
    pub feedback_id: Uuid,
    pub node_id: String,
    pub reviewer_id: String,
    pub decision: ReviewDecision,
    pub comments: String,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    Approved,
    Rejected,
    ChangesRequested,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalDecision {
    Continue,
    Retry,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub node_id: String,
    pub status: ReviewStatus,
    pub feedback: Vec<ReviewFeedback>,
    pub final_decision: FinalDecision,
    #[serde(default)]
    pub modified_instructions: Option<String>,
    #[serde(default)]
    pub retry_context: Option<Vec<ReviewFeedback>>,
}
