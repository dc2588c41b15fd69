//! Core domain models for the flow engine.
//!
//! These types are the source of truth for what a flow looks like in
//! memory. They serialize to/from the JSONB `definition` column of the
//! `workflows` table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use review::ReviewScope;

// ---------------------------------------------------------------------------
// Node config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_true")]
    pub retry_on_failure: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub requires_review: bool,
    #[serde(default = "default_review_scope")]
    pub review_scope: ReviewScope,
    #[serde(default)]
    pub review_criteria: Option<String>,
    #[serde(default)]
    pub review_timeout_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    5 * 60 * 1000
}

fn default_review_scope() -> ReviewScope {
    ReviewScope::Full
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            retry_on_failure: true,
            max_retries: 3,
            timeout_ms: default_timeout_ms(),
            requires_review: false,
            review_scope: ReviewScope::Full,
            review_criteria: None,
            review_timeout_ms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single step in the flow graph. Immutable once constructed; per-attempt
/// state lives exclusively on [`NodeExecutionState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub agent_id: String,
    pub label: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    #[serde(default)]
    pub position: Value,
    #[serde(default)]
    pub config: NodeConfig,
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub edge_id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// An immutable flow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub flow_id: Uuid,
    pub version: u32,
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub metadata: Value,
}

impl Flow {
    pub fn new(name: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { flow_id: Uuid::new_v4(), version: 1, name: name.into(), nodes, edges, metadata: Value::Null }
    }
}

// ---------------------------------------------------------------------------
// Execution state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    Initializing,
    Running,
    Paused,
    Completed,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Reviewing,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionState {
    pub status: NodeStatus,
    pub attempts: u32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub instance_id: Option<Uuid>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub last_error: Option<String>,
    /// Carried across a retry/review cycle: instructions appended from a
    /// review's `modified_instructions`, merged back into the node's input.
    #[serde(default)]
    pub appended_instructions: Option<String>,
}

impl NodeExecutionState {
    pub fn pending() -> Self {
        Self {
            status: NodeStatus::Pending,
            attempts: 0,
            started_at: None,
            completed_at: None,
            instance_id: None,
            output: None,
            last_error: None,
            appended_instructions: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    pub flow_id: Uuid,
    pub execution_id: Uuid,
    pub status: FlowStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub errors: Vec<String>,
    pub nodes: HashMap<String, NodeExecutionState>,
    pub outputs: HashMap<String, Value>,
}

impl ExecutionState {
    pub fn new(flow_id: Uuid, execution_id: Uuid, node_ids: impl IntoIterator<Item = String>) -> Self {
        let nodes = node_ids.into_iter().map(|id| (id, NodeExecutionState::pending())).collect();
        Self {
            flow_id,
            execution_id,
            status: FlowStatus::Initializing,
            started_at: Utc::now(),
            completed_at: None,
            errors: Vec::new(),
            nodes,
            outputs: HashMap::new(),
        }
    }

    /// Invariant I5: completed iff every node is completed or skipped, and
    /// at least one node reached completed.
    pub fn is_complete(&self) -> bool {
        let any_completed = self.nodes.values().any(|n| n.status == NodeStatus::Completed);
        let all_terminal = self.nodes.values().all(|n| matches!(n.status, NodeStatus::Completed | NodeStatus::Skipped));
        any_completed && all_terminal
    }

    pub fn has_failure(&self) -> bool {
        self.nodes.values().any(|n| n.status == NodeStatus::Failed)
    }
}
