//! Shared application state: one instance per process, wiring every
//! component crate together the way `spec.md`'s design notes call for —
//! an explicit registry object, owned here, handed to both the hook
//! ingress and every executor this process creates.

use std::collections::HashMap;
use std::sync::Arc;

use db::DbPool;
use engine::{FlowExecutor, OrchestratorRegistry};
use events::EventMultiplexer;
use hooks::HookIngress;
use queue::JobQueue;
use supervisor::{AgentDefinition, Supervisor, SupervisorEvent};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::config::Config;

/// Live executors for runs currently in flight, keyed by `execution_id`.
/// An executor is removed once its `execute()` future returns.
#[derive(Default)]
pub struct ExecutorTable {
    by_execution: Mutex<HashMap<Uuid, Arc<FlowExecutor>>>,
}

impl ExecutorTable {
    pub async fn insert(&self, executor: Arc<FlowExecutor>) {
        self.by_execution.lock().await.insert(executor.execution_id(), executor);
    }

    pub async fn get(&self, execution_id: Uuid) -> Option<Arc<FlowExecutor>> {
        self.by_execution.lock().await.get(&execution_id).cloned()
    }

    pub async fn remove(&self, execution_id: Uuid) {
        self.by_execution.lock().await.remove(&execution_id);
    }

    /// Linear scan by `flow_id`. Only reached from the hook-callback and
    /// review HTTP paths, never the dispatch hot loop, so an index isn't
    /// worth the bookkeeping.
    pub async fn find_by_flow(&self, flow_id: Uuid) -> Option<Arc<FlowExecutor>> {
        self.by_execution.lock().await.values().find(|executor| executor.flow_id() == flow_id).cloned()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub agents: Arc<HashMap<String, AgentDefinition>>,
    pub supervisor: Arc<Supervisor>,
    pub registry: Arc<OrchestratorRegistry>,
    pub events: Arc<EventMultiplexer>,
    pub queue: Arc<JobQueue>,
    pub hooks: Arc<HookIngress>,
    pub executors: Arc<ExecutorTable>,
}

impl AppState {
    /// Construct every shared component. Returns the raw supervisor event
    /// receiver alongside the state so the caller can spawn
    /// [`crate::supervisor_bridge::run`] on it once.
    pub fn new(pool: DbPool, config: &Config) -> (Self, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let agents = Arc::new(config.load_agent_catalog());
        let (supervisor, supervisor_events) =
            Supervisor::new(config.project_root.clone(), config.hook_base_url.clone(), config.agent_command.clone());
        let registry = Arc::new(OrchestratorRegistry::new());
        let events = Arc::new(EventMultiplexer::new());
        let queue = Arc::new(JobQueue::new(pool.clone()));
        let hooks = Arc::new(HookIngress::new(registry.routes(), registry.clone()));
        let executors = Arc::new(ExecutorTable::default());

        (Self { pool, agents, supervisor, registry, events, queue, hooks, executors }, supervisor_events)
    }
}
