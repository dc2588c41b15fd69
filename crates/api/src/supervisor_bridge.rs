//! Forwards raw subprocess-level [`SupervisorEvent`]s into the event
//! multiplexer as node-room events, resolving each instance's flow through
//! the hook-routing table.
//!
//! `Supervisor` is a single process-wide singleton shared by every flow, so
//! unlike hook events (which already carry a resolvable `node_id` the
//! ingress routes itself) this bridge has to look up `flow_id` the same
//! way the ingress does before the event can be published into the right
//! rooms.

use std::sync::Arc;

use engine::OrchestratorRegistry;
use events::{Event, EventKind, EventMultiplexer};
use serde_json::json;
use supervisor::{InstanceStatus, SupervisorEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

pub async fn run(mut rx: UnboundedReceiver<SupervisorEvent>, registry: Arc<OrchestratorRegistry>, events: Arc<EventMultiplexer>) {
    while let Some(supervisor_event) = rx.recv().await {
        let (node_id, built) = match supervisor_event {
            SupervisorEvent::Output { node_id, line, .. } => {
                let payload = json!({ "stream": format!("{:?}", line.stream), "text": line.text, "at": line.at });
                (node_id.clone(), Event::new(EventKind::AgentOutput, payload).with_node(node_id))
            }
            SupervisorEvent::StatusChanged { node_id, status, .. } => {
                let kind = if status == InstanceStatus::Error { EventKind::AgentError } else { EventKind::NodeUpdate };
                let payload = json!({ "status": status });
                (node_id.clone(), Event::new(kind, payload).with_node(node_id))
            }
            SupervisorEvent::Stopped { node_id, metrics, .. } => {
                let payload = serde_json::to_value(&metrics).unwrap_or_else(|_| json!({}));
                (node_id.clone(), Event::new(EventKind::AgentStopped, payload).with_node(node_id))
            }
        };

        let event = match registry.routes().flow_for_node(&node_id) {
            Some(flow_id) => built.with_flow(flow_id),
            None => {
                debug!(node_id = %node_id, "supervisor event for a node with no registered flow");
                built
            }
        };
        events.publish(event);
    }
}
