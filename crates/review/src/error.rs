//! Review coordinator error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("no review request is open for node '{0}'")]
    UnknownRequest(String),

    #[error("review request for node '{0}' has already completed")]
    AlreadyCompleted(String),
}
