//! `AgentInstance` — the supervisor's record of one live (or exited)
//! subprocess execution.

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an [`AgentInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Initializing,
    Running,
    Stopped,
    Error,
}

/// Which stdio stream a buffered log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTag {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub stream: StreamTag,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// A bounded ring of log lines, capped by total byte size rather than
/// line count, so a single instance can't blow out process memory.
#[derive(Debug, Clone)]
pub struct LogRing {
    max_bytes: usize,
    bytes: usize,
    lines: VecDeque<LogLine>,
}

impl LogRing {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes, bytes: 0, lines: VecDeque::new() }
    }

    pub fn push(&mut self, line: LogLine) {
        self.bytes += line.text.len();
        self.lines.push_back(line);
        while self.bytes > self.max_bytes {
            match self.lines.pop_front() {
                Some(evicted) => self.bytes = self.bytes.saturating_sub(evicted.text.len()),
                None => break,
            }
        }
    }

    pub fn snapshot(&self) -> Vec<LogLine> {
        self.lines.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceMetrics {
    pub duration_ms: Option<u64>,
    pub exit_code: Option<i32>,
}

/// Exclusive record of one subprocess execution. The subprocess handle
/// itself lives only inside `Supervisor` (never exposed to callers);
/// this type is what the supervisor stores and what
/// [`super::supervisor::Supervisor::get`] returns a read-only snapshot of.
pub struct AgentInstance {
    pub instance_id: Uuid,
    pub node_id: String,
    pub flow_id: Uuid,
    pub project_dir: PathBuf,
    pub status: InstanceStatus,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub logs: LogRing,
    pub metrics: InstanceMetrics,
    pub(crate) child: Option<tokio::process::Child>,
}

/// A serializable, handle-free view of an [`AgentInstance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInstanceView {
    pub instance_id: Uuid,
    pub node_id: String,
    pub flow_id: Uuid,
    pub project_dir: PathBuf,
    pub status: InstanceStatus,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub logs: Vec<LogLine>,
    pub metrics: InstanceMetrics,
}

impl From<&AgentInstance> for AgentInstanceView {
    fn from(instance: &AgentInstance) -> Self {
        Self {
            instance_id: instance.instance_id,
            node_id: instance.node_id.clone(),
            flow_id: instance.flow_id,
            project_dir: instance.project_dir.clone(),
            status: instance.status,
            started_at: instance.started_at,
            stopped_at: instance.stopped_at,
            logs: instance.logs.snapshot(),
            metrics: instance.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_ring_evicts_oldest_once_over_budget() {
        let mut ring = LogRing::new(10);
        for i in 0..5 {
            ring.push(LogLine { stream: StreamTag::Stdout, text: format!("line{i}"), at: Utc::now() });
        }
        let snapshot = ring.snapshot();
        let total_bytes: usize = snapshot.iter().map(|l| l.text.len()).sum();
        assert!(total_bytes <= 10);
        assert!(snapshot.last().unwrap().text.ends_with('4'));
    }
}
