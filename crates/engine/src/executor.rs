//! `FlowExecutor` — drives one flow's execution from dispatch through
//! completion, coordinating the resolver's layering, the supervisor's
//! subprocesses, the retry policy's backoff, and the review coordinator's
//! suspension points.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hooks::HookEvent;
use resolver::{DependencyResolver, GraphEdge, GraphNode};
use retry::{BackoffConfig, ClassifiedError, ErrorKind, RetryPolicy};
use review::{FinalDecision, ReviewCoordinator, ReviewFeedback, ReviewRequest, ReviewResult};
use serde_json::{json, Value};
use supervisor::{AgentDefinition, SpawnRequest, Supervisor};
use tokio::sync::{mpsc, oneshot, watch, Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use events::{Event, EventKind, EventMultiplexer};

use crate::error::EngineError;
use crate::input_merge::merge_inputs;
use crate::models::{ExecutionState, Flow, FlowStatus, Node, NodeStatus};
use crate::registry::OrchestratorRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlState {
    Running,
    Paused,
    Aborted,
}

enum Eligibility {
    Proceed,
    Skip,
    Halted,
}

enum AttemptOutcome {
    Completed,
    Retry,
    Failed,
    Paused,
    Halted,
}

enum Terminal {
    Stopped(Value),
    Errored(String),
    TimedOut,
    ChannelClosed,
    Paused,
    Aborted,
}

pub struct FlowExecutorConfig {
    pub backoff: BackoffConfig,
}

impl Default for FlowExecutorConfig {
    fn default() -> Self {
        Self { backoff: BackoffConfig::default() }
    }
}

/// Owns one flow's in-memory execution. Created fresh per run; a finished
/// executor is not reused.
pub struct FlowExecutor {
    flow: Flow,
    execution_id: Uuid,
    agents: HashMap<String, AgentDefinition>,
    resolver: DependencyResolver,
    supervisor: Arc<Supervisor>,
    registry: Arc<OrchestratorRegistry>,
    events: Arc<EventMultiplexer>,
    retry_policy: RetryPolicy,
    reviews: ReviewCoordinator,
    state: Mutex<ExecutionState>,
    notify: Notify,
    control: watch::Sender<ControlState>,
    cancel: CancellationToken,
    node_channels: Mutex<HashMap<String, mpsc::UnboundedSender<HookEvent>>>,
    review_waiters: Mutex<HashMap<String, oneshot::Sender<ReviewResult>>>,
}

impl FlowExecutor {
    pub fn new(
        flow: Flow,
        agents: HashMap<String, AgentDefinition>,
        supervisor: Arc<Supervisor>,
        registry: Arc<OrchestratorRegistry>,
        events: Arc<EventMultiplexer>,
        config: FlowExecutorConfig,
    ) -> Result<Arc<Self>, EngineError> {
        let graph_nodes: Vec<GraphNode> = flow.nodes.iter().map(|n| GraphNode { id: n.id.clone() }).collect();
        let graph_edges: Vec<GraphEdge> = flow
            .edges
            .iter()
            .map(|e| GraphEdge { id: e.edge_id.clone(), from: e.source_node_id.clone(), to: e.target_node_id.clone() })
            .collect();
        let resolver = DependencyResolver::new(&graph_nodes, &graph_edges)?;

        let execution_id = Uuid::new_v4();
        let node_ids: Vec<String> = flow.nodes.iter().map(|n| n.id.clone()).collect();
        let state = ExecutionState::new(flow.flow_id, execution_id, node_ids);
        let (control, _) = watch::channel(ControlState::Running);

        Ok(Arc::new(Self {
            flow,
            execution_id,
            agents,
            resolver,
            supervisor,
            registry,
            events,
            retry_policy: RetryPolicy::new(config.backoff),
            reviews: ReviewCoordinator::new(),
            state: Mutex::new(state),
            notify: Notify::new(),
            control,
            cancel: CancellationToken::new(),
            node_channels: Mutex::new(HashMap::new()),
            review_waiters: Mutex::new(HashMap::new()),
        }))
    }

    pub fn flow_id(&self) -> Uuid {
        self.flow.flow_id
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Validate the flow graph is acyclic before spending any effort on it.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.resolver.execution_plan().map(|_| ())
    }

    /// Run every node to a terminal state, honoring pause/resume/abort
    /// signals delivered concurrently through the other public methods.
    pub async fn execute(self: &Arc<Self>) -> Result<ExecutionState, EngineError> {
        self.resolver.execution_plan()?;

        let node_ids: Vec<String> = self.flow.nodes.iter().map(|n| n.id.clone()).collect();
        let hook_rx = self.registry.register_flow(self.flow.flow_id, node_ids.clone());

        {
            let mut state = self.state.lock().await;
            state.status = FlowStatus::Running;
        }
        self.publish(EventKind::FlowStarted, json!({ "node_count": node_ids.len() }), None);

        let pump = tokio::spawn(Self::pump_hook_events(self.clone(), hook_rx));

        let mut handles = Vec::with_capacity(node_ids.len());
        for node_id in &node_ids {
            let this = self.clone();
            let node_id = node_id.clone();
            handles.push(tokio::spawn(async move { this.run_node(&node_id).await }));
        }
        for handle in handles {
            let _ = handle.await;
        }

        pump.abort();
        self.registry.deregister_flow(self.flow.flow_id);
        for node_id in &node_ids {
            self.retry_policy.forget(node_id);
        }

        let mut state = self.state.lock().await;
        if state.status != FlowStatus::Aborted {
            state.status = if state.nodes.is_empty() {
                FlowStatus::Completed
            } else if state.has_failure() {
                FlowStatus::Failed
            } else if state.is_complete() {
                FlowStatus::Completed
            } else {
                FlowStatus::Failed
            };
            state.completed_at = Some(chrono::Utc::now());
        }
        let final_state = state.clone();
        drop(state);

        match final_state.status {
            FlowStatus::Completed => self.publish(EventKind::FlowCompleted, json!({}), None),
            FlowStatus::Failed => self.publish(EventKind::FlowFailed, json!({ "errors": final_state.errors }), None),
            FlowStatus::Aborted => self.publish(EventKind::FlowAborted, json!({}), None),
            _ => {}
        }

        Ok(final_state)
    }

    pub async fn get_state(&self) -> ExecutionState {
        self.state.lock().await.clone()
    }

    /// Stop all running subprocesses and suspend dispatch. Running nodes are
    /// requeued as pending so `resume` re-enters them fresh.
    pub async fn pause(self: &Arc<Self>) -> Result<(), EngineError> {
        let _ = self.control.send(ControlState::Paused);
        self.supervisor.stop_all(self.flow.flow_id).await;
        {
            let mut state = self.state.lock().await;
            if state.status == FlowStatus::Running {
                state.status = FlowStatus::Paused;
            }
        }
        self.publish(EventKind::FlowPaused, json!({}), None);
        Ok(())
    }

    pub async fn resume(self: &Arc<Self>) -> Result<(), EngineError> {
        let _ = self.control.send(ControlState::Running);
        {
            let mut state = self.state.lock().await;
            if state.status == FlowStatus::Paused {
                state.status = FlowStatus::Running;
            }
        }
        self.publish(EventKind::FlowResumed, json!({}), None);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Terminate the flow forcefully. Already-completed nodes keep their
    /// results; everything else is marked failed.
    pub async fn abort(self: &Arc<Self>) -> Result<(), EngineError> {
        let _ = self.control.send(ControlState::Aborted);
        self.cancel.cancel();
        self.supervisor.stop_all(self.flow.flow_id).await;
        {
            let mut state = self.state.lock().await;
            state.status = FlowStatus::Aborted;
            state.completed_at = Some(chrono::Utc::now());
            for node_state in state.nodes.values_mut() {
                if !matches!(node_state.status, NodeStatus::Completed | NodeStatus::Skipped) {
                    node_state.status = NodeStatus::Failed;
                    node_state.last_error.get_or_insert_with(|| "flow aborted".to_string());
                }
            }
        }
        self.notify.notify_waiters();
        Ok(())
    }

    pub async fn submit_review_feedback(&self, feedback: ReviewFeedback) -> Result<(), EngineError> {
        let node_id = feedback.node_id.clone();
        match self.reviews.submit_feedback(feedback) {
            Ok(Some(result)) => {
                let waiter = self.review_waiters.lock().await.remove(&node_id);
                if let Some(tx) = waiter {
                    let _ = tx.send(result);
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => Err(EngineError::HookFailed { node_id, message: err.to_string() }),
        }
    }

    pub fn get_active_reviews(&self) -> Vec<String> {
        self.flow.nodes.iter().map(|n| n.id.clone()).filter(|id| self.reviews.is_open(id)).collect()
    }

    pub fn get_review_history(&self, node_id: &str) -> Vec<ReviewResult> {
        self.reviews.history_for(node_id)
    }

    // -----------------------------------------------------------------
    // Dispatch loop
    // -----------------------------------------------------------------

    async fn run_node(self: Arc<Self>, node_id: &str) {
        loop {
            match self.wait_until_eligible(node_id).await {
                Eligibility::Skip => {
                    self.mark_skipped(node_id).await;
                    return;
                }
                Eligibility::Halted => return,
                Eligibility::Proceed => {}
            }

            match self.attempt_node(node_id).await {
                AttemptOutcome::Completed => return,
                AttemptOutcome::Retry | AttemptOutcome::Paused => continue,
                AttemptOutcome::Failed => {
                    self.cascade_skip(node_id).await;
                    return;
                }
                AttemptOutcome::Halted => return,
            }
        }
    }

    async fn wait_until_eligible(&self, node_id: &str) -> Eligibility {
        loop {
            if *self.control.borrow() == ControlState::Aborted {
                return Eligibility::Halted;
            }

            // Register for the next wakeup before checking state, so a
            // completion/failure/pause-lift that lands between the check
            // below and the await isn't missed — `Notify::notified()` only
            // observes permits stored after it was created.
            let notified = self.notify.notified();
            tokio::pin!(notified);

            if *self.control.borrow() == ControlState::Paused {
                notified.await;
                continue;
            }

            let dependencies = self.resolver.dependencies(node_id);
            let state = self.state.lock().await;
            let statuses: Vec<NodeStatus> = dependencies.iter().filter_map(|d| state.nodes.get(d)).map(|n| n.status).collect();
            drop(state);

            if statuses.iter().any(|s| matches!(s, NodeStatus::Failed | NodeStatus::Skipped)) {
                return Eligibility::Skip;
            }
            if statuses.iter().all(|s| *s == NodeStatus::Completed) {
                return Eligibility::Proceed;
            }

            notified.await;
        }
    }

    async fn attempt_node(self: &Arc<Self>, node_id: &str) -> AttemptOutcome {
        let Some(node) = self.flow.nodes.iter().find(|n| n.id == node_id).cloned() else {
            return AttemptOutcome::Failed;
        };
        let Some(agent) = self.agents.get(&node.agent_id).cloned() else {
            self.fail_node(node_id, format!("no agent registered for '{}'", node.agent_id)).await;
            return AttemptOutcome::Failed;
        };

        let attempt = {
            let mut state = self.state.lock().await;
            let node_state = state.nodes.get_mut(node_id).expect("node registered at construction");
            node_state.attempts += 1;
            node_state.status = NodeStatus::Running;
            node_state.started_at.get_or_insert_with(chrono::Utc::now);
            node_state.attempts
        };

        let appended = {
            let state = self.state.lock().await;
            state.nodes.get(node_id).and_then(|n| n.appended_instructions.clone())
        };
        let instructions = match &appended {
            Some(extra) => format!("{}\n\n{extra}", node.instructions),
            None => node.instructions.clone(),
        };

        let input_data = {
            let state = self.state.lock().await;
            merge_inputs(&node, &self.flow.edges, &state.outputs)
        };

        self.publish(EventKind::NodeStarted, json!({ "attempt": attempt }), Some(node_id));

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.node_channels.lock().await.insert(node_id.to_string(), tx);

        let spawn_result = self
            .supervisor
            .spawn(SpawnRequest {
                flow_id: self.flow.flow_id,
                node_id,
                node_label: &node.label,
                node_instructions: &instructions,
                agent: &agent,
                input_data: &input_data,
            })
            .await;

        let instance_id = match spawn_result {
            Ok(id) => id,
            Err(err) => {
                self.node_channels.lock().await.remove(node_id);
                return self.handle_attempt_failure(node_id, &node, attempt, ClassifiedError::new(ErrorKind::Runtime, err.to_string())).await;
            }
        };
        {
            let mut state = self.state.lock().await;
            if let Some(node_state) = state.nodes.get_mut(node_id) {
                node_state.instance_id = Some(instance_id);
            }
        }

        let mut control_rx = self.control.subscribe();
        let timeout = tokio::time::sleep(Duration::from_millis(node.config.timeout_ms));
        tokio::pin!(timeout);

        let terminal = loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(HookEvent::Stop { output, .. }) => break Terminal::Stopped(output),
                        Some(HookEvent::Error { error, .. }) => break Terminal::Errored(error),
                        Some(_) => continue,
                        None => break Terminal::ChannelClosed,
                    }
                }
                _ = &mut timeout => break Terminal::TimedOut,
                changed = control_rx.changed() => {
                    if changed.is_err() { continue; }
                    match *control_rx.borrow() {
                        ControlState::Paused => break Terminal::Paused,
                        ControlState::Aborted => break Terminal::Aborted,
                        ControlState::Running => continue,
                    }
                }
            }
        };

        self.node_channels.lock().await.remove(node_id);

        match terminal {
            Terminal::Stopped(output) => self.handle_node_output(node_id, &node, output).await,
            Terminal::Errored(message) => {
                let classified = classify_error(&message);
                self.handle_attempt_failure(node_id, &node, attempt, classified).await
            }
            Terminal::TimedOut => {
                let _ = self.supervisor.stop(instance_id).await;
                let classified = ClassifiedError::new(ErrorKind::Timeout, format!("node timed out after {}ms", node.config.timeout_ms));
                self.handle_attempt_failure(node_id, &node, attempt, classified).await
            }
            Terminal::ChannelClosed => {
                let classified = ClassifiedError::new(ErrorKind::Runtime, "hook channel closed before a terminal event arrived");
                self.handle_attempt_failure(node_id, &node, attempt, classified).await
            }
            Terminal::Paused => {
                let _ = self.supervisor.stop(instance_id).await;
                let mut state = self.state.lock().await;
                if let Some(node_state) = state.nodes.get_mut(node_id) {
                    node_state.status = NodeStatus::Pending;
                }
                AttemptOutcome::Paused
            }
            Terminal::Aborted => AttemptOutcome::Halted,
        }
    }

    async fn handle_node_output(self: &Arc<Self>, node_id: &str, node: &Node, output: Value) -> AttemptOutcome {
        if node.config.requires_review {
            return self.run_review(node_id, node, output).await;
        }
        self.complete_node(node_id, output).await;
        AttemptOutcome::Completed
    }

    async fn run_review(self: &Arc<Self>, node_id: &str, node: &Node, output: Value) -> AttemptOutcome {
        {
            let mut state = self.state.lock().await;
            if let Some(node_state) = state.nodes.get_mut(node_id) {
                node_state.status = NodeStatus::Reviewing;
                node_state.output = Some(output.clone());
            }
        }
        self.publish(EventKind::NodeReview, json!({ "scope": node.config.review_scope }), Some(node_id));

        let request = ReviewRequest {
            node_id: node_id.to_string(),
            flow_id: self.flow.flow_id,
            scope: node.config.review_scope,
            files: None,
            criteria: node.config.review_criteria.clone(),
            timeout_ms: node.config.review_timeout_ms,
            requires_approval: true,
            required_approvals: 1,
            metadata: json!({}),
            opened_at: chrono::Utc::now(),
        };
        self.reviews.open_request(request);

        let (tx, rx) = oneshot::channel();
        self.review_waiters.lock().await.insert(node_id.to_string(), tx);

        let result = if let Some(timeout_ms) = node.config.review_timeout_ms {
            tokio::select! {
                received = rx => received.ok(),
                _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => {
                    self.review_waiters.lock().await.remove(node_id);
                    self.reviews.expire(node_id).ok()
                }
                _ = self.cancel.cancelled() => return AttemptOutcome::Halted,
            }
        } else {
            tokio::select! {
                received = rx => received.ok(),
                _ = self.cancel.cancelled() => return AttemptOutcome::Halted,
            }
        };

        let Some(result) = result else {
            self.fail_node(node_id, "review channel closed without a result".to_string()).await;
            return AttemptOutcome::Failed;
        };

        match result.final_decision {
            FinalDecision::Continue => {
                self.complete_node(node_id, output).await;
                AttemptOutcome::Completed
            }
            FinalDecision::Retry => {
                let mut state = self.state.lock().await;
                if let Some(node_state) = state.nodes.get_mut(node_id) {
                    node_state.status = NodeStatus::Pending;
                    node_state.appended_instructions = result.modified_instructions.clone();
                }
                drop(state);
                self.notify.notify_waiters();
                self.publish(EventKind::NodeRetry, json!({ "reason": "changes_requested" }), Some(node_id));
                AttemptOutcome::Retry
            }
            FinalDecision::Abort => {
                self.fail_node(node_id, "rejected in review".to_string()).await;
                AttemptOutcome::Failed
            }
        }
    }

    async fn handle_attempt_failure(&self, node_id: &str, node: &Node, attempt: u32, classified: ClassifiedError) -> AttemptOutcome {
        if node.config.retry_on_failure && self.retry_policy.should_retry(node_id, attempt, node.config.max_retries, &classified) {
            let delay = self.retry_policy.delay_for(node_id, attempt);
            self.publish(EventKind::NodeRetry, json!({ "attempt": attempt, "delay_ms": delay.as_millis() }), Some(node_id));

            let context = self.retry_policy.context_for(node_id, &[], HashMap::new());
            {
                let mut state = self.state.lock().await;
                if let Some(node_state) = state.nodes.get_mut(node_id) {
                    node_state.status = NodeStatus::Pending;
                    node_state.appended_instructions = Some(retry_context_note(&context));
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => AttemptOutcome::Retry,
                _ = self.cancel.cancelled() => AttemptOutcome::Halted,
            }
        } else {
            self.retry_policy.record_outcome(node_id, false);
            self.fail_node(node_id, classified.message).await;
            AttemptOutcome::Failed
        }
    }

    async fn complete_node(&self, node_id: &str, output: Value) {
        self.retry_policy.record_outcome(node_id, true);
        let mut state = self.state.lock().await;
        if let Some(node_state) = state.nodes.get_mut(node_id) {
            node_state.status = NodeStatus::Completed;
            node_state.completed_at = Some(chrono::Utc::now());
            node_state.output = Some(output.clone());
        }
        state.outputs.insert(node_id.to_string(), output);
        drop(state);
        self.notify.notify_waiters();
        self.publish(EventKind::NodeCompleted, json!({}), Some(node_id));
    }

    async fn fail_node(&self, node_id: &str, message: String) {
        let mut state = self.state.lock().await;
        if let Some(node_state) = state.nodes.get_mut(node_id) {
            node_state.status = NodeStatus::Failed;
            node_state.completed_at = Some(chrono::Utc::now());
            node_state.last_error = Some(message.clone());
        }
        state.errors.push(format!("{node_id}: {message}"));
        drop(state);
        self.notify.notify_waiters();
        self.publish(EventKind::NodeFailed, json!({ "error": message }), Some(node_id));
    }

    async fn mark_skipped(&self, node_id: &str) {
        let mut state = self.state.lock().await;
        if let Some(node_state) = state.nodes.get_mut(node_id) {
            if node_state.status == NodeStatus::Pending {
                node_state.status = NodeStatus::Skipped;
            }
        }
        drop(state);
        self.notify.notify_waiters();
        self.publish(EventKind::NodeSkipped, json!({}), Some(node_id));
    }

    async fn cascade_skip(&self, node_id: &str) {
        for descendant in self.resolver.descendants(node_id) {
            let should_skip = {
                let state = self.state.lock().await;
                state.nodes.get(&descendant).map(|n| n.status == NodeStatus::Pending).unwrap_or(false)
            };
            if should_skip {
                self.mark_skipped(&descendant).await;
            }
        }
    }

    async fn pump_hook_events(self: Arc<Self>, mut hook_rx: mpsc::UnboundedReceiver<HookEvent>) {
        while let Some(event) = hook_rx.recv().await {
            let (kind, payload) = match &event {
                HookEvent::Stop { status, .. } => (EventKind::HookStop, json!({ "status": status })),
                HookEvent::Error { error, .. } => (EventKind::HookError, json!({ "error": error })),
                HookEvent::Checkpoint { name, data, .. } => (EventKind::HookCheckpoint, json!({ "name": name, "data": data })),
                HookEvent::FileChange { files, .. } => (EventKind::HookFileChange, json!({ "files": files })),
            };
            self.publish(kind, payload, Some(event.node_id()));

            let channels = self.node_channels.lock().await;
            if let Some(tx) = channels.get(event.node_id()) {
                if tx.send(event).is_err() {
                    warn!("node task for hook event already gone");
                }
            }
        }
    }

    fn publish(&self, kind: EventKind, payload: Value, node_id: Option<&str>) {
        let mut event = Event::new(kind, payload).with_flow(self.flow.flow_id).with_execution(self.execution_id);
        if let Some(node_id) = node_id {
            event = event.with_node(node_id);
        }
        self.events.publish(event);
    }
}

/// Heuristic classification of an agent-reported error message into a
/// retriable/non-retriable [`ErrorKind`].
fn classify_error(message: &str) -> ClassifiedError {
    let lower = message.to_lowercase();
    let kind = if lower.contains("timeout") || lower.contains("timed out") {
        ErrorKind::Timeout
    } else if lower.contains("connection") || lower.contains("network") || lower.contains("dns") {
        ErrorKind::Network
    } else if lower.contains("assert") || lower.contains("expectation") {
        ErrorKind::Assertion
    } else if lower.contains("syntax") || lower.contains("parse error") {
        ErrorKind::Syntax
    } else if lower.contains("dependency") || lower.contains("not found") {
        ErrorKind::Dependency
    } else {
        ErrorKind::Runtime
    };
    ClassifiedError::new(kind, message)
}

fn retry_context_note(context: &retry::RetryContext) -> String {
    serde_json::to_string_pretty(context).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Edge, NodeConfig, NodeStatus};
    use std::collections::HashMap as Map;
    use supervisor::InstructionsTemplate;

    fn test_node(id: &str, agent_id: &str) -> Node {
        Node {
            id: id.into(),
            agent_id: agent_id.into(),
            label: id.into(),
            instructions: "do the thing".into(),
            inputs: Map::new(),
            position: Value::Null,
            config: NodeConfig { timeout_ms: 300, ..Default::default() },
        }
    }

    fn test_agent() -> AgentDefinition {
        AgentDefinition {
            agent_id: "echo".into(),
            category: "test".into(),
            instructions_template: InstructionsTemplate { base: "base".into(), contextual: String::new() },
            declared_inputs: vec![],
            declared_outputs: vec![],
            claude_md: None,
            metadata: json!({}),
        }
    }

    fn build_executor(flow: Flow) -> (Arc<FlowExecutor>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (supervisor, _rx) = Supervisor::new(dir.path(), "http://localhost:1234", "true");
        let registry = Arc::new(OrchestratorRegistry::new());
        let events = Arc::new(EventMultiplexer::new());
        let mut agents = Map::new();
        agents.insert("echo".to_string(), test_agent());
        let mut config = FlowExecutorConfig::default();
        config.backoff.base_delay = Duration::from_millis(5);
        let executor = FlowExecutor::new(flow, agents, supervisor, registry, events, config).unwrap();
        (executor, dir)
    }

    #[tokio::test]
    async fn single_node_flow_times_out_when_agent_never_calls_the_stop_hook() {
        let flow = Flow::new("f", vec![test_node("a", "echo")], vec![]);
        let (executor, _dir) = build_executor(flow);
        let state = executor.execute().await.unwrap();
        // the stub agent command ("true") exits without ever POSTing to the
        // stop hook, so the node must time out rather than hang forever.
        assert_eq!(state.status, FlowStatus::Failed);
        assert_eq!(state.nodes["a"].status, NodeStatus::Failed);
        assert!(state.nodes["a"].attempts >= 1);
    }

    #[tokio::test]
    async fn unknown_agent_fails_immediately() {
        let flow = Flow::new("f", vec![test_node("a", "ghost")], vec![]);
        let (executor, _dir) = build_executor(flow);
        let state = executor.execute().await.unwrap();
        assert_eq!(state.nodes["a"].status, NodeStatus::Failed);
        assert!(state.nodes["a"].last_error.as_ref().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn downstream_node_is_skipped_when_upstream_fails() {
        let flow = Flow::new(
            "f",
            vec![test_node("a", "ghost"), test_node("b", "echo")],
            vec![Edge { edge_id: "e1".into(), source_node_id: "a".into(), target_node_id: "b".into(), source_handle: None, target_handle: None }],
        );
        let (executor, _dir) = build_executor(flow);
        let state = executor.execute().await.unwrap();
        assert_eq!(state.nodes["a"].status, NodeStatus::Failed);
        assert_eq!(state.nodes["b"].status, NodeStatus::Skipped);
    }

    #[tokio::test]
    async fn abort_marks_non_terminal_nodes_failed() {
        let flow = Flow::new("f", vec![test_node("a", "echo")], vec![]);
        let (executor, _dir) = build_executor(flow);
        let exec = executor.clone();
        let handle = tokio::spawn(async move { exec.execute().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        executor.abort().await.unwrap();
        let state = handle.await.unwrap().unwrap();
        assert_eq!(state.status, FlowStatus::Aborted);
    }
}
