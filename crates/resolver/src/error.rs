//! Resolver-level error types.

use thiserror::Error;

/// Errors produced while validating a flow's dependency graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node ID that doesn't exist in the flow.
    #[error("edge '{edge_id}' references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        edge_id: String,
        node_id: String,
        side: &'static str,
    },

    /// The graph is not acyclic. Carries one witness cycle, in traversal order.
    #[error("cyclic dependency detected: {}", witness.join(" -> "))]
    CyclicDependency { witness: Vec<String> },
}
