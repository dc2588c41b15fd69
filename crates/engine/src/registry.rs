//! Bridges the Hook Ingress's routing table to running [`FlowExecutor`]s.
//!
//! Owned by whoever starts flows (the `queue`/`api` wiring layer) and handed
//! to both the hooks ingress (as a [`hooks::FlowRegistry`] + [`hooks::HookSink`])
//! and the executors it creates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hooks::{FlowRegistry, HookEvent, HookSink};
use tracing::warn;
use uuid::Uuid;

pub struct OrchestratorRegistry {
    routes: Arc<FlowRegistry>,
    channels: Mutex<HashMap<Uuid, tokio::sync::mpsc::UnboundedSender<HookEvent>>>,
}

impl Default for OrchestratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorRegistry {
    pub fn new() -> Self {
        Self { routes: Arc::new(FlowRegistry::new()), channels: Mutex::new(HashMap::new()) }
    }

    /// The shared routing table, handed to [`hooks::HookIngress`] so both
    /// sides resolve a `node_id` against the exact same registrations.
    pub fn routes(&self) -> Arc<FlowRegistry> {
        self.routes.clone()
    }

    /// Register a flow's nodes for hook routing and wire up the channel
    /// its executor will receive hook events on.
    pub fn register_flow(&self, flow_id: Uuid, node_ids: impl IntoIterator<Item = String>) -> tokio::sync::mpsc::UnboundedReceiver<HookEvent> {
        self.routes.register(flow_id, node_ids);
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.channels.lock().expect("registry lock poisoned").insert(flow_id, tx);
        rx
    }

    pub fn deregister_flow(&self, flow_id: Uuid) {
        self.routes.deregister_flow(flow_id);
        self.channels.lock().expect("registry lock poisoned").remove(&flow_id);
    }
}

impl HookSink for OrchestratorRegistry {
    fn dispatch(&self, event: HookEvent) {
        let flow_id = event.flow_id();
        let channels = self.channels.lock().expect("registry lock poisoned");
        match channels.get(&flow_id) {
            Some(tx) => {
                if tx.send(event).is_err() {
                    warn!(%flow_id, "executor channel closed, dropping hook event");
                }
            }
            None => warn!(%flow_id, "no executor registered for flow, dropping hook event"),
        }
    }
}
