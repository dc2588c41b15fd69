//! Hook ingress error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("agent-complete output must be a structured object, got a scalar")]
    OutputNotAnObject,

    #[error("request body failed validation: {0}")]
    InvalidBody(String),

    #[error("no flow is registered for node '{0}'")]
    UnknownNode(String),
}
