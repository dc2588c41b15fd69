//! Normalized, flow-addressed form of an incoming hook payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::HookError;
use crate::payload::{AgentCompleteBody, AgentErrorBody, CheckpointBody, FileChangedBody};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookEvent {
    Stop { flow_id: Uuid, node_id: String, status: String, output: Value, at: DateTime<Utc> },
    FileChange { flow_id: Uuid, node_id: String, files: Vec<String>, at: DateTime<Utc> },
    Error { flow_id: Uuid, node_id: String, error: String, at: DateTime<Utc> },
    Checkpoint { flow_id: Uuid, node_id: String, name: String, data: Value, at: DateTime<Utc> },
}

impl HookEvent {
    pub fn node_id(&self) -> &str {
        match self {
            HookEvent::Stop { node_id, .. }
            | HookEvent::FileChange { node_id, .. }
            | HookEvent::Error { node_id, .. }
            | HookEvent::Checkpoint { node_id, .. } => node_id,
        }
    }

    pub fn flow_id(&self) -> Uuid {
        match self {
            HookEvent::Stop { flow_id, .. }
            | HookEvent::FileChange { flow_id, .. }
            | HookEvent::Error { flow_id, .. }
            | HookEvent::Checkpoint { flow_id, .. } => *flow_id,
        }
    }

    pub fn from_agent_complete(flow_id: Uuid, body: AgentCompleteBody) -> Result<Self, HookError> {
        if !body.output.is_object() {
            return Err(HookError::OutputNotAnObject);
        }
        Ok(HookEvent::Stop {
            flow_id,
            node_id: body.node_id,
            status: body.status,
            output: body.output,
            at: epoch_to_datetime(body.timestamp),
        })
    }

    pub fn from_file_changed(flow_id: Uuid, body: FileChangedBody) -> Self {
        HookEvent::FileChange { flow_id, node_id: body.node_id, files: body.files, at: epoch_to_datetime(body.timestamp) }
    }

    pub fn from_agent_error(flow_id: Uuid, body: AgentErrorBody) -> Self {
        HookEvent::Error { flow_id, node_id: body.node_id, error: body.error, at: epoch_to_datetime(body.timestamp) }
    }

    pub fn from_checkpoint(flow_id: Uuid, body: CheckpointBody) -> Self {
        HookEvent::Checkpoint {
            flow_id,
            node_id: body.node_id,
            name: body.name,
            data: body.data,
            at: epoch_to_datetime(body.timestamp),
        }
    }
}

fn epoch_to_datetime(epoch_seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch_seconds, 0).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_complete_rejects_scalar_output() {
        let body = AgentCompleteBody { node_id: "n1".into(), status: "completed".into(), output: json!(42), timestamp: 0 };
        assert_eq!(HookEvent::from_agent_complete(Uuid::new_v4(), body), Err(HookError::OutputNotAnObject));
    }

    #[test]
    fn agent_complete_accepts_object_output() {
        let body = AgentCompleteBody {
            node_id: "n1".into(),
            status: "completed".into(),
            output: json!({ "result": "ok" }),
            timestamp: 1_700_000_000,
        };
        let event = HookEvent::from_agent_complete(Uuid::new_v4(), body).unwrap();
        assert_eq!(event.node_id(), "n1");
    }
}
