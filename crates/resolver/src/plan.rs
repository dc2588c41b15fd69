//! The layered execution plan produced by [`crate::DependencyResolver`].

use serde::{Deserialize, Serialize};

/// A set of node IDs that may run in parallel: every node in layer `k`
/// has all of its ancestors in some layer `< k`, and at least one
/// ancestor (if any) in layer `k - 1`.
pub type Layer = Vec<String>;

/// An ordered sequence of layers covering every node in the flow exactly once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub layers: Vec<Layer>,
}

impl ExecutionPlan {
    /// The layer index a given node was assigned to, if present in the plan.
    pub fn layer_of(&self, node_id: &str) -> Option<usize> {
        self.layers
            .iter()
            .position(|layer| layer.iter().any(|id| id == node_id))
    }

    /// Total number of nodes covered by the plan.
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(|l| l.len()).sum()
    }
}
