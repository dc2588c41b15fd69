//! Engine-level error types, mapped onto the exit codes/error kinds
//! surfaced to external callers.

use thiserror::Error;

/// Errors produced by the flow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("flow graph contains a cycle")]
    CyclicDependency,

    #[error("reference to unknown node '{0}'")]
    UnknownNode(String),

    #[error("no agent registered for agent_id '{0}'")]
    UnknownAgent(String),

    #[error("failed to spawn agent subprocess for node '{node_id}': {message}")]
    SpawnFailed { node_id: String, message: String },

    #[error("node '{node_id}' timed out after {timeout_ms}ms")]
    Timeout { node_id: String, timeout_ms: u64 },

    #[error("hook ingress rejected the callback for node '{node_id}': {message}")]
    HookFailed { node_id: String, message: String },

    #[error("node '{0}' produced output that failed validation")]
    OutputValidationFailed(String),

    #[error("node '{0}' cannot run because a dependency failed")]
    DependencyFailed(String),

    #[error("node '{0}' was rejected in review")]
    ReviewRejected(String),

    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("unknown error: {0}")]
    Unknown(String),

    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error("resolver error: {0}")]
    Resolver(#[from] resolver::ResolverError),

    #[error("supervisor error: {0}")]
    Supervisor(#[from] supervisor::SupervisorError),
}

impl EngineError {
    /// The machine-readable error kind surfaced to external callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CyclicDependency => "CYCLIC_DEPENDENCY",
            Self::UnknownNode(_) => "UNKNOWN_NODE",
            Self::UnknownAgent(_) => "UNKNOWN_AGENT",
            Self::SpawnFailed { .. } => "SPAWN_FAILED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::HookFailed { .. } => "HOOK_FAILED",
            Self::OutputValidationFailed(_) => "OUTPUT_VALIDATION_FAILED",
            Self::DependencyFailed(_) => "DEPENDENCY_FAILED",
            Self::ReviewRejected(_) => "REVIEW_REJECTED",
            Self::ResourceLimit(_) => "RESOURCE_LIMIT",
            Self::NetworkError(_) => "NETWORK_ERROR",
            Self::Unknown(_) | Self::Database(_) | Self::Resolver(_) | Self::Supervisor(_) => "UNKNOWN",
        }
    }
}
