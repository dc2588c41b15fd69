//! Error classification used to decide retriability.

use serde::{Deserialize, Serialize};

/// The category a node failure is labeled with.
///
/// `Assertion`, `Syntax`, and `Logic` are non-retriable: once classified
/// as one of these, [`crate::policy::RetryPolicy::should_retry`] returns
/// `false` regardless of `max_retries`. The rest are retriable until
/// exhaustion or the monotone non-improvement rule trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Network,
    Dependency,
    Assertion,
    Syntax,
    Logic,
    Performance,
    Runtime,
}

impl ErrorKind {
    /// Non-retriable kinds are terminal on the first occurrence.
    pub fn is_retriable_class(self) -> bool {
        !matches!(self, ErrorKind::Assertion | ErrorKind::Syntax | ErrorKind::Logic)
    }
}

/// A single classified node failure, as produced by whichever collaborator
/// observed it (Supervisor exit code, Hook Ingress `/agent-error`, executor
/// timeout, …).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    /// A coarse fingerprint of the root cause, used by the monotone
    /// non-improvement rule to recognize "the same failure happening again".
    /// Callers without a finer signal may simply pass `message` verbatim.
    pub signature: String,
    /// Up to three stack frames, most-recent first. May be empty.
    pub stack_frames: Vec<String>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self { signature: message.clone(), message, kind, stack_frames: Vec::new() }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn with_stack_frames(mut self, frames: Vec<String>) -> Self {
        self.stack_frames = frames;
        self
    }
}
