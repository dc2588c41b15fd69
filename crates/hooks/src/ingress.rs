//! Top-level entry point the `api` crate's axum handlers call into.

use std::sync::Arc;

use tracing::warn;

use crate::diagnostics::DiagnosticRing;
use crate::error::HookError;
use crate::event::HookEvent;
use crate::payload::{AgentCompleteBody, AgentErrorBody, CheckpointBody, FileChangedBody};
use crate::registry::FlowRegistry;
use crate::sink::HookSink;

/// Wires the routing table, the diagnostic ring, and the downstream sink
/// together. Unknown `node_id`s are logged and dropped rather than erroring,
/// per the ingress's "never crash the server" contract.
pub struct HookIngress {
    registry: Arc<FlowRegistry>,
    diagnostics: DiagnosticRing,
    sink: Arc<dyn HookSink>,
}

impl HookIngress {
    pub fn new(registry: Arc<FlowRegistry>, sink: Arc<dyn HookSink>) -> Self {
        Self { registry, diagnostics: DiagnosticRing::new(), sink }
    }

    pub fn agent_complete(&self, body: AgentCompleteBody) -> Result<(), HookError> {
        let Some(flow_id) = self.registry.flow_for_node(&body.node_id) else {
            warn!(node_id = %body.node_id, "agent-complete for unregistered node, dropping");
            return Ok(());
        };
        let event = HookEvent::from_agent_complete(flow_id, body)?;
        self.emit(event);
        Ok(())
    }

    pub fn file_changed(&self, body: FileChangedBody) {
        let Some(flow_id) = self.registry.flow_for_node(&body.node_id) else {
            warn!(node_id = %body.node_id, "file-changed for unregistered node, dropping");
            return;
        };
        self.emit(HookEvent::from_file_changed(flow_id, body));
    }

    pub fn agent_error(&self, body: AgentErrorBody) {
        let Some(flow_id) = self.registry.flow_for_node(&body.node_id) else {
            warn!(node_id = %body.node_id, "agent-error for unregistered node, dropping");
            return;
        };
        self.emit(HookEvent::from_agent_error(flow_id, body));
    }

    pub fn checkpoint(&self, body: CheckpointBody) {
        let Some(flow_id) = self.registry.flow_for_node(&body.node_id) else {
            warn!(node_id = %body.node_id, "checkpoint for unregistered node, dropping");
            return;
        };
        self.emit(HookEvent::from_checkpoint(flow_id, body));
    }

    pub fn recent_events(&self) -> Vec<HookEvent> {
        self.diagnostics.snapshot()
    }

    fn emit(&self, event: HookEvent) {
        self.diagnostics.record(event.clone());
        self.sink.dispatch(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct RecordingSink {
        events: Mutex<Vec<HookEvent>>,
    }

    impl HookSink for RecordingSink {
        fn dispatch(&self, event: HookEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn unregistered_node_is_dropped_without_error() {
        let registry = Arc::new(FlowRegistry::new());
        let sink = Arc::new(RecordingSink { events: Mutex::new(Vec::new()) });
        let ingress = HookIngress::new(registry, sink.clone());

        let result = ingress.agent_complete(AgentCompleteBody {
            node_id: "ghost".into(),
            status: "completed".into(),
            output: json!({}),
            timestamp: 0,
        });
        assert!(result.is_ok());
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[test]
    fn registered_node_dispatches_and_records() {
        let registry = Arc::new(FlowRegistry::new());
        let flow_id = Uuid::new_v4();
        registry.register(flow_id, ["n1".to_string()]);
        let sink = Arc::new(RecordingSink { events: Mutex::new(Vec::new()) });
        let ingress = HookIngress::new(registry, sink.clone());

        ingress
            .agent_complete(AgentCompleteBody {
                node_id: "n1".into(),
                status: "completed".into(),
                output: json!({ "ok": true }),
                timestamp: 1_700_000_000,
            })
            .unwrap();

        assert_eq!(sink.events.lock().unwrap().len(), 1);
        assert_eq!(ingress.recent_events().len(), 1);
    }

    #[test]
    fn scalar_output_is_rejected_before_dispatch() {
        let registry = Arc::new(FlowRegistry::new());
        let flow_id = Uuid::new_v4();
        registry.register(flow_id, ["n1".to_string()]);
        let sink = Arc::new(RecordingSink { events: Mutex::new(Vec::new()) });
        let ingress = HookIngress::new(registry, sink.clone());

        let result = ingress.agent_complete(AgentCompleteBody {
            node_id: "n1".into(),
            status: "completed".into(),
            output: json!("not an object"),
            timestamp: 0,
        });
        assert_eq!(result, Err(HookError::OutputNotAnObject));
        assert!(sink.events.lock().unwrap().is_empty());
    }
}
