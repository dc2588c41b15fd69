//! Wire-format event envelope and the taxonomy of kinds it can carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FlowStarted,
    FlowCompleted,
    FlowFailed,
    FlowPaused,
    FlowResumed,
    FlowAborted,
    NodeStarted,
    NodeCompleted,
    NodeFailed,
    NodeRetry,
    NodeReview,
    NodeSkipped,
    NodeUpdate,
    AgentOutput,
    AgentStopped,
    AgentError,
    HookStop,
    HookError,
    HookCheckpoint,
    HookFileChange,
    PreviewData,
    MetricsUpdate,
}

impl EventKind {
    /// The room-qualified wire name, e.g. `flow:started`, `node:retry`.
    pub fn wire_name(self) -> &'static str {
        use EventKind::*;
        match self {
            FlowStarted => "flow:started",
            FlowCompleted => "flow:completed",
            FlowFailed => "flow:failed",
            FlowPaused => "flow:paused",
            FlowResumed => "flow:resumed",
            FlowAborted => "flow:aborted",
            NodeStarted => "node:started",
            NodeCompleted => "node:completed",
            NodeFailed => "node:failed",
            NodeRetry => "node:retry",
            NodeReview => "node:review",
            NodeSkipped => "node:skipped",
            NodeUpdate => "node:update",
            AgentOutput => "agent:output",
            AgentStopped => "agent:stopped",
            AgentError => "agent:error",
            HookStop => "hook:stop",
            HookError => "hook:error",
            HookCheckpoint => "hook:checkpoint",
            HookFileChange => "hook:file_change",
            PreviewData => "preview:data",
            MetricsUpdate => "metrics:update",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "event")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

impl Event {
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self { kind, flow_id: None, node_id: None, project_id: None, execution_id: None, timestamp: Utc::now(), payload }
    }

    pub fn with_flow(mut self, flow_id: Uuid) -> Self {
        self.flow_id = Some(flow_id);
        self
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_execution(mut self, execution_id: Uuid) -> Self {
        self.execution_id = Some(execution_id);
        self
    }
}
