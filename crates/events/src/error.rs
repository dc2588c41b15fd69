//! Event multiplexer error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventsError {
    #[error("role '{role}' is not authorized to perform '{action}'")]
    Unauthorized { role: String, action: String },
}
