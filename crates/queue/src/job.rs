//! Job payloads placed on the flow-queue and node-queue.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use db::models::QueueKind;

/// A whole flow submitted for execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowJob {
    pub flow_id: Uuid,
    pub workflow_id: Uuid,
    /// The project this run is attributed to, for the audit trail.
    pub project_id: Uuid,
    /// The flow definition (nodes, edges, metadata) as submitted.
    pub flow: Value,
    /// Submission-time options (e.g. initial inputs, dry-run flags).
    pub options: Value,
    /// Higher runs first within the flow-queue. Defaults to 0.
    pub priority: Option<i32>,
    /// Delay before the job becomes eligible to run.
    pub delay: Option<std::time::Duration>,
}

/// A single node dispatch, re-enqueued on every retry attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeJob {
    pub node_id: String,
    pub flow_id: Uuid,
    pub attempt: u32,
    pub max_attempts: u32,
}

pub(crate) fn queue_name(kind: QueueKind) -> &'static str {
    match kind {
        QueueKind::Flow => "flow",
        QueueKind::Node => "node",
    }
}

/// Backoff defaults per queue kind: flow jobs retry up to 3 times with a
/// 2s exponential base; node jobs retry up to their own `max_attempts`
/// with a 1s exponential base.
pub(crate) fn default_backoff(kind: QueueKind) -> retry::BackoffConfig {
    match kind {
        QueueKind::Flow => retry::BackoffConfig {
            mode: retry::BackoffMode::Exponential,
            base_delay: std::time::Duration::from_secs(2),
            ..retry::BackoffConfig::default()
        },
        QueueKind::Node => retry::BackoffConfig {
            mode: retry::BackoffMode::Exponential,
            base_delay: std::time::Duration::from_secs(1),
            ..retry::BackoffConfig::default()
        },
    }
}

pub(crate) fn default_max_attempts(kind: QueueKind) -> i32 {
    match kind {
        QueueKind::Flow => 3,
        QueueKind::Node => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_backoff_base_is_two_seconds() {
        let config = default_backoff(QueueKind::Flow);
        assert_eq!(config.base_delay, std::time::Duration::from_secs(2));
        assert_eq!(default_max_attempts(QueueKind::Flow), 3);
    }

    #[test]
    fn node_backoff_base_is_one_second() {
        let config = default_backoff(QueueKind::Node);
        assert_eq!(config.base_delay, std::time::Duration::from_secs(1));
    }

    #[test]
    fn queue_names_match_the_job_queue_column_values() {
        assert_eq!(queue_name(QueueKind::Flow), "flow");
        assert_eq!(queue_name(QueueKind::Node), "node");
    }
}
