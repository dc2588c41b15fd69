//! `node_id → flow_id` routing table.
//!
//! Reader-many/writer-one: writes happen only at flow registration
//! (and deregistration on teardown); reads happen on every hook call.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

#[derive(Default)]
pub struct FlowRegistry {
    by_node: RwLock<HashMap<String, Uuid>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, flow_id: Uuid, node_ids: impl IntoIterator<Item = String>) {
        let mut by_node = self.by_node.write().expect("registry lock poisoned");
        for node_id in node_ids {
            by_node.insert(node_id, flow_id);
        }
    }

    pub fn deregister_flow(&self, flow_id: Uuid) {
        let mut by_node = self.by_node.write().expect("registry lock poisoned");
        by_node.retain(|_, v| *v != flow_id);
    }

    pub fn flow_for_node(&self, node_id: &str) -> Option<Uuid> {
        let by_node = self.by_node.read().expect("registry lock poisoned");
        by_node.get(node_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_resolves_nodes() {
        let registry = FlowRegistry::new();
        let flow_id = Uuid::new_v4();
        registry.register(flow_id, ["n1".to_string(), "n2".to_string()]);
        assert_eq!(registry.flow_for_node("n1"), Some(flow_id));
        assert_eq!(registry.flow_for_node("missing"), None);
    }

    #[test]
    fn deregister_removes_only_that_flows_nodes() {
        let registry = FlowRegistry::new();
        let flow_a = Uuid::new_v4();
        let flow_b = Uuid::new_v4();
        registry.register(flow_a, ["n1".to_string()]);
        registry.register(flow_b, ["n2".to_string()]);
        registry.deregister_flow(flow_a);
        assert_eq!(registry.flow_for_node("n1"), None);
        assert_eq!(registry.flow_for_node("n2"), Some(flow_b));
    }
}
