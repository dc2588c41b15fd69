//! Supervisor-level error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("an instance is already running for flow {flow_id} / node '{node_id}'")]
    AlreadyRunning { flow_id: uuid::Uuid, node_id: String },

    #[error("failed to materialize project directory: {0}")]
    ProjectDirSetup(#[from] std::io::Error),

    #[error("failed to spawn agent subprocess: {0}")]
    SpawnFailed(String),

    #[error("no instance found with id {0}")]
    UnknownInstance(uuid::Uuid),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
