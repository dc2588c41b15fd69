//! `Supervisor` — owns every live [`AgentInstance`] and is the only part of
//! this crate allowed to touch a `tokio::process::Child`.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::AgentDefinition;
use crate::error::SupervisorError;
use crate::instance::{AgentInstance, AgentInstanceView, InstanceMetrics, InstanceStatus, LogLine, LogRing, StreamTag};
use crate::project_dir::{self, ProjectDirInputs};

const LOG_RING_MAX_BYTES: usize = 256 * 1024;
const GRACE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    Output { instance_id: Uuid, node_id: String, line: LogLine },
    StatusChanged { instance_id: Uuid, node_id: String, status: InstanceStatus },
    Stopped { instance_id: Uuid, node_id: String, metrics: InstanceMetrics },
}

pub struct SpawnRequest<'a> {
    pub flow_id: Uuid,
    pub node_id: &'a str,
    pub node_label: &'a str,
    pub node_instructions: &'a str,
    pub agent: &'a AgentDefinition,
    pub input_data: &'a Value,
}

/// Shared subprocess supervisor. Always used behind `Arc<Supervisor>` so the
/// background reader/waiter tasks it spawns can hold a handle back to it.
pub struct Supervisor {
    root_dir: std::path::PathBuf,
    hook_base_url: String,
    agent_command: String,
    instances: Mutex<HashMap<Uuid, AgentInstance>>,
    by_node: Mutex<HashMap<(Uuid, String), Uuid>>,
    events: mpsc::UnboundedSender<SupervisorEvent>,
}

impl Supervisor {
    pub fn new(
        root_dir: impl Into<std::path::PathBuf>,
        hook_base_url: impl Into<String>,
        agent_command: impl Into<String>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = Arc::new(Self {
            root_dir: root_dir.into(),
            hook_base_url: hook_base_url.into(),
            agent_command: agent_command.into(),
            instances: Mutex::new(HashMap::new()),
            by_node: Mutex::new(HashMap::new()),
            events: tx,
        });
        (supervisor, rx)
    }

    /// Spawn a new agent instance for `request.node_id` within `request.flow_id`.
    /// Enforces that at most one instance may be in flight per (flow, node) pair.
    pub async fn spawn(self: &Arc<Self>, request: SpawnRequest<'_>) -> Result<Uuid, SupervisorError> {
        let key = (request.flow_id, request.node_id.to_string());
        {
            let by_node = self.by_node.lock().await;
            if by_node.contains_key(&key) {
                return Err(SupervisorError::AlreadyRunning { flow_id: request.flow_id, node_id: request.node_id.to_string() });
            }
        }

        let project_dir = project_dir::materialize(
            &self.root_dir,
            request.flow_id,
            ProjectDirInputs {
                node_id: request.node_id,
                node_label: request.node_label,
                node_instructions: request.node_instructions,
                agent: request.agent,
                input_data: request.input_data,
                hook_base_url: &self.hook_base_url,
            },
        )
        .await?;

        let mut command = Command::new(&self.agent_command);
        command
            .current_dir(&project_dir)
            .arg("instructions.md")
            .env("PROJECT_DIR", &project_dir)
            .env("NO_COLOR", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| SupervisorError::SpawnFailed(e.to_string()))?;
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let instance_id = Uuid::new_v4();
        let instance = AgentInstance {
            instance_id,
            node_id: request.node_id.to_string(),
            flow_id: request.flow_id,
            project_dir,
            status: InstanceStatus::Running,
            started_at: Utc::now(),
            stopped_at: None,
            logs: LogRing::new(LOG_RING_MAX_BYTES),
            metrics: InstanceMetrics::default(),
            child: Some(child),
        };

        {
            let mut instances = self.instances.lock().await;
            instances.insert(instance_id, instance);
        }
        {
            let mut by_node = self.by_node.lock().await;
            by_node.insert(key, instance_id);
        }

        self.spawn_stream_reader(instance_id, request.node_id.to_string(), StreamTag::Stdout, stdout);
        self.spawn_stream_reader(instance_id, request.node_id.to_string(), StreamTag::Stderr, stderr);
        self.spawn_waiter(instance_id);

        info!(%instance_id, node_id = request.node_id, flow_id = %request.flow_id, "spawned agent instance");
        Ok(instance_id)
    }

    fn spawn_stream_reader<R>(self: &Arc<Self>, instance_id: Uuid, node_id: String, tag: StreamTag, reader: R)
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(text)) = lines.next_line().await {
                let line = LogLine { stream: tag, text, at: Utc::now() };
                let mut instances = supervisor.instances.lock().await;
                if let Some(instance) = instances.get_mut(&instance_id) {
                    instance.logs.push(line.clone());
                }
                drop(instances);
                let _ = supervisor.events.send(SupervisorEvent::Output { instance_id, node_id: node_id.clone(), line });
            }
        });
    }

    /// Polls rather than holding an owned `Child` across a single `.wait()`,
    /// so `instance.child` stays `Some` (and reachable by `stop()`) for the
    /// entire time the process is actually running.
    fn spawn_waiter(self: &Arc<Self>, instance_id: Uuid) {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let exit = loop {
                let mut instances = supervisor.instances.lock().await;
                let Some(instance) = instances.get_mut(&instance_id) else { return };
                let Some(child) = instance.child.as_mut() else { return };
                match child.try_wait() {
                    Ok(Some(status)) => break Ok(status),
                    Ok(None) => {}
                    Err(e) => break Err(e),
                }
                drop(instances);
                tokio::time::sleep(Duration::from_millis(200)).await;
            };

            let mut instances = supervisor.instances.lock().await;
            let Some(instance) = instances.get_mut(&instance_id) else { return };
            instance.child = None;
            let node_id = instance.node_id.clone();
            instance.status = match &exit {
                Ok(status) if status.success() => InstanceStatus::Stopped,
                _ => InstanceStatus::Error,
            };
            instance.stopped_at = Some(Utc::now());
            instance.metrics.exit_code = exit.ok().and_then(|s| s.code());
            instance.metrics.duration_ms =
                Some((instance.stopped_at.unwrap() - instance.started_at).num_milliseconds().max(0) as u64);
            let metrics = instance.metrics.clone();
            drop(instances);

            let mut by_node = supervisor.by_node.lock().await;
            by_node.retain(|_, v| *v != instance_id);
            drop(by_node);

            let _ = supervisor.events.send(SupervisorEvent::Stopped { instance_id, node_id, metrics });
        });
    }

    /// Terminate an instance. Sends SIGTERM, waits up to a grace period, then
    /// SIGKILLs if the process hasn't exited on its own.
    #[cfg(unix)]
    pub async fn stop(self: &Arc<Self>, instance_id: Uuid) -> Result<(), SupervisorError> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let pid = {
            let instances = self.instances.lock().await;
            let instance = instances.get(&instance_id).ok_or(SupervisorError::UnknownInstance(instance_id))?;
            instance.child.as_ref().and_then(|c| c.id())
        };

        let Some(pid) = pid else {
            // already reaped by the waiter task
            return Ok(());
        };

        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);

        let deadline = tokio::time::Instant::now() + GRACE_PERIOD;
        loop {
            if tokio::time::Instant::now() >= deadline {
                warn!(%instance_id, "grace period elapsed, sending SIGKILL");
                let mut instances = self.instances.lock().await;
                if let Some(instance) = instances.get_mut(&instance_id) {
                    if let Some(child) = instance.child.as_mut() {
                        let _ = child.start_kill();
                    }
                }
                return Ok(());
            }

            let still_running = {
                let instances = self.instances.lock().await;
                instances.get(&instance_id).map(|i| i.child.is_some()).unwrap_or(false)
            };
            if !still_running {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    #[cfg(not(unix))]
    pub async fn stop(self: &Arc<Self>, instance_id: Uuid) -> Result<(), SupervisorError> {
        let mut instances = self.instances.lock().await;
        let instance = instances.get_mut(&instance_id).ok_or(SupervisorError::UnknownInstance(instance_id))?;
        if let Some(child) = instance.child.as_mut() {
            let _ = child.start_kill();
        }
        Ok(())
    }

    pub async fn stop_all(self: &Arc<Self>, flow_id: Uuid) {
        let ids: Vec<Uuid> = {
            let instances = self.instances.lock().await;
            instances.values().filter(|i| i.flow_id == flow_id).map(|i| i.instance_id).collect()
        };
        for id in ids {
            let _ = self.stop(id).await;
        }
    }

    pub async fn get(&self, instance_id: Uuid) -> Option<AgentInstanceView> {
        let instances = self.instances.lock().await;
        instances.get(&instance_id).map(AgentInstanceView::from)
    }

    pub async fn get_by_node(&self, flow_id: Uuid, node_id: &str) -> Option<AgentInstanceView> {
        let instance_id = {
            let by_node = self.by_node.lock().await;
            *by_node.get(&(flow_id, node_id.to_string()))?
        };
        self.get(instance_id).await
    }

    pub async fn list_for_flow(&self, flow_id: Uuid) -> Vec<AgentInstanceView> {
        let instances = self.instances.lock().await;
        instances.values().filter(|i| i.flow_id == flow_id).map(AgentInstanceView::from).collect()
    }

    /// Drop all finished instance records for a flow, freeing memory. Running
    /// instances are left untouched.
    pub async fn cleanup(&self, flow_id: Uuid) {
        let mut instances = self.instances.lock().await;
        instances.retain(|_, i| !(i.flow_id == flow_id && i.status != InstanceStatus::Running));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_agent() -> AgentDefinition {
        AgentDefinition {
            agent_id: "echo".into(),
            category: "test".into(),
            instructions_template: crate::agent::InstructionsTemplate { base: "base".into(), contextual: String::new() },
            declared_inputs: vec![],
            declared_outputs: vec![],
            claude_md: None,
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn spawn_rejects_duplicate_node_instance() {
        let tmp = tempfile::tempdir().unwrap();
        let (supervisor, _rx) = Supervisor::new(tmp.path(), "http://127.0.0.1:9000", "true");
        let flow_id = Uuid::new_v4();
        let agent = test_agent();
        let input = json!({});

        let first = supervisor
            .spawn(SpawnRequest {
                flow_id,
                node_id: "n1",
                node_label: "N1",
                node_instructions: "do it",
                agent: &agent,
                input_data: &input,
            })
            .await;
        assert!(first.is_ok());

        let second = supervisor
            .spawn(SpawnRequest {
                flow_id,
                node_id: "n1",
                node_label: "N1",
                node_instructions: "do it",
                agent: &agent,
                input_data: &input,
            })
            .await;
        assert!(matches!(second, Err(SupervisorError::AlreadyRunning { .. })));
    }

    #[tokio::test]
    async fn spawned_instance_is_retrievable() {
        let tmp = tempfile::tempdir().unwrap();
        let (supervisor, _rx) = Supervisor::new(tmp.path(), "http://127.0.0.1:9000", "true");
        let flow_id = Uuid::new_v4();
        let agent = test_agent();
        let input = json!({});

        let instance_id = supervisor
            .spawn(SpawnRequest {
                flow_id,
                node_id: "n1",
                node_label: "N1",
                node_instructions: "do it",
                agent: &agent,
                input_data: &input,
            })
            .await
            .unwrap();

        let view = supervisor.get(instance_id).await;
        assert!(view.is_some());
        assert_eq!(view.unwrap().node_id, "n1");
    }
}
