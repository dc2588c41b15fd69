//! Kahn's-algorithm-based dependency resolution.
//!
//! Rules enforced at construction time:
//! 1. Node IDs must be unique within the flow.
//! 2. Every edge must reference valid node IDs (both `from` and `to`).
//!
//! [`DependencyResolver::execution_plan`] additionally requires the graph
//! to be acyclic; duplicate edges are silently deduplicated (idempotent
//! ingestion) rather than rejected.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ResolverError;
use crate::plan::{ExecutionPlan, Layer};

/// The minimal node shape the resolver needs: an opaque, flow-unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
}

/// The minimal edge shape the resolver needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
}

/// Validated, queryable view over a flow's dependency graph.
pub struct DependencyResolver {
    node_ids: Vec<String>,
    adjacency: HashMap<String, Vec<String>>,
    reverse: HashMap<String, Vec<String>>,
}

impl DependencyResolver {
    /// Validate `nodes`/`edges` and build a resolver over them.
    ///
    /// Cycle detection is deferred to [`Self::execution_plan`] /
    /// [`Self::has_cycle`] — a cyclic graph is still a well-formed input
    /// here, just one that cannot produce a layered plan.
    pub fn new(nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<Self, ResolverError> {
        let mut seen_ids: HashSet<&str> = HashSet::new();
        for node in nodes {
            if !seen_ids.insert(node.id.as_str()) {
                return Err(ResolverError::DuplicateNodeId(node.id.clone()));
            }
        }
        let node_set: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let mut adjacency: HashMap<String, Vec<String>> =
            nodes.iter().map(|n| (n.id.clone(), Vec::new())).collect();
        let mut reverse: HashMap<String, Vec<String>> =
            nodes.iter().map(|n| (n.id.clone(), Vec::new())).collect();
        let mut dedup: HashSet<(String, String)> = HashSet::new();

        for edge in edges {
            if !node_set.contains(edge.from.as_str()) {
                return Err(ResolverError::UnknownNodeReference {
                    edge_id: edge.id.clone(),
                    node_id: edge.from.clone(),
                    side: "from",
                });
            }
            if !node_set.contains(edge.to.as_str()) {
                return Err(ResolverError::UnknownNodeReference {
                    edge_id: edge.id.clone(),
                    node_id: edge.to.clone(),
                    side: "to",
                });
            }
            if dedup.insert((edge.from.clone(), edge.to.clone())) {
                adjacency.get_mut(&edge.from).unwrap().push(edge.to.clone());
                reverse.get_mut(&edge.to).unwrap().push(edge.from.clone());
            }
        }

        Ok(Self {
            node_ids: nodes.iter().map(|n| n.id.clone()).collect(),
            adjacency,
            reverse,
        })
    }

    /// Whether the graph contains a cycle (self-loops included).
    pub fn has_cycle(&self) -> bool {
        self.kahn_layers().is_none()
    }

    /// Nodes with neither incoming nor outgoing edges.
    pub fn orphans(&self) -> Vec<String> {
        self.node_ids
            .iter()
            .filter(|id| {
                self.adjacency.get(id.as_str()).map_or(true, Vec::is_empty)
                    && self.reverse.get(id.as_str()).map_or(true, Vec::is_empty)
            })
            .cloned()
            .collect()
    }

    /// Direct ancestors (sources of incoming edges) of `node_id`.
    pub fn dependencies(&self, node_id: &str) -> Vec<String> {
        self.reverse.get(node_id).cloned().unwrap_or_default()
    }

    /// Direct descendants (targets of outgoing edges) of `node_id`.
    pub fn dependents(&self, node_id: &str) -> Vec<String> {
        self.adjacency.get(node_id).cloned().unwrap_or_default()
    }

    /// All transitive ancestors of `node_id` (excludes itself).
    pub fn ancestors(&self, node_id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<String> = self.reverse.get(node_id).cloned().unwrap_or_default();
        while let Some(n) = stack.pop() {
            if seen.insert(n.clone()) {
                stack.extend(self.reverse.get(&n).cloned().unwrap_or_default());
            }
        }
        seen
    }

    /// All transitive descendants of `node_id` (excludes itself).
    pub fn descendants(&self, node_id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<String> = self.adjacency.get(node_id).cloned().unwrap_or_default();
        while let Some(n) = stack.pop() {
            if seen.insert(n.clone()) {
                stack.extend(self.adjacency.get(&n).cloned().unwrap_or_default());
            }
        }
        seen
    }

    /// Produce the layered execution plan (I7), or a [`ResolverError::CyclicDependency`]
    /// carrying one witness cycle.
    pub fn execution_plan(&self) -> Result<ExecutionPlan, ResolverError> {
        match self.kahn_layers() {
            Some(layers) => Ok(ExecutionPlan { layers }),
            None => Err(ResolverError::CyclicDependency {
                witness: self.find_cycle_witness(),
            }),
        }
    }

    /// Kahn's algorithm, emitting whole frontiers as layers rather than a
    /// flat order. Returns `None` if a cycle prevents full traversal.
    fn kahn_layers(&self) -> Option<Vec<Layer>> {
        let mut in_degree: HashMap<&str, usize> =
            self.node_ids.iter().map(|id| (id.as_str(), 0)).collect();
        for targets in self.adjacency.values() {
            for to in targets {
                *in_degree.get_mut(to.as_str()).unwrap() += 1;
            }
        }

        let mut layers: Vec<Layer> = Vec::new();
        let mut frontier: Vec<&str> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();
        frontier.sort_unstable();

        let mut visited = 0usize;
        while !frontier.is_empty() {
            visited += frontier.len();
            layers.push(frontier.iter().map(|s| s.to_string()).collect());

            let mut next: Vec<&str> = Vec::new();
            for &id in &frontier {
                for to in self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                    let degree = in_degree.get_mut(to.as_str()).unwrap();
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(to.as_str());
                    }
                }
            }
            next.sort_unstable();
            next.dedup();
            frontier = next;
        }

        (visited == self.node_ids.len()).then_some(layers)
    }

    /// DFS with a recursion-stack set, returning the first back-edge found
    /// as a witness cycle. Only called once `has_cycle`/`execution_plan`
    /// has already established that a cycle exists.
    fn find_cycle_witness(&self) -> Vec<String> {
        let mut visiting: HashSet<&str> = HashSet::new();
        let mut done: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();

        fn dfs<'a>(
            node: &'a str,
            adjacency: &'a HashMap<String, Vec<String>>,
            visiting: &mut HashSet<&'a str>,
            done: &mut HashSet<&'a str>,
            stack: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            visiting.insert(node);
            stack.push(node);

            for next in adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]) {
                let next = next.as_str();
                if visiting.contains(next) {
                    let start = stack.iter().position(|&n| n == next).unwrap();
                    let mut witness: Vec<String> =
                        stack[start..].iter().map(|s| s.to_string()).collect();
                    witness.push(next.to_string());
                    return Some(witness);
                }
                if !done.contains(next) {
                    if let Some(witness) = dfs(next, adjacency, visiting, done, stack) {
                        return Some(witness);
                    }
                }
            }

            stack.pop();
            visiting.remove(node);
            done.insert(node);
            None
        }

        for id in &self.node_ids {
            if !done.contains(id.as_str()) {
                if let Some(witness) =
                    dfs(id.as_str(), &self.adjacency, &mut visiting, &mut done, &mut stack)
                {
                    return witness;
                }
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> GraphNode {
        GraphNode { id: id.to_string() }
    }

    fn edge(id: &str, from: &str, to: &str) -> GraphEdge {
        GraphEdge { id: id.to_string(), from: from.to_string(), to: to.to_string() }
    }

    #[test]
    fn linear_dag_produces_one_node_per_layer() {
        let r = DependencyResolver::new(
            &[node("a"), node("b"), node("c")],
            &[edge("e1", "a", "b"), edge("e2", "b", "c")],
        )
        .unwrap();

        let plan = r.execution_plan().unwrap();
        assert_eq!(plan.layers, vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn diamond_dag_groups_middle_layer() {
        let r = DependencyResolver::new(
            &[node("a"), node("b"), node("c"), node("d")],
            &[
                edge("e1", "a", "b"),
                edge("e2", "a", "c"),
                edge("e3", "b", "d"),
                edge("e4", "c", "d"),
            ],
        )
        .unwrap();

        let plan = r.execution_plan().unwrap();
        assert_eq!(plan.layers.len(), 3);
        assert_eq!(plan.layers[0], vec!["a"]);
        assert_eq!(plan.layers[2], vec!["d"]);
        let mut middle = plan.layers[1].clone();
        middle.sort();
        assert_eq!(middle, vec!["b", "c"]);
    }

    #[test]
    fn duplicate_node_id_rejected() {
        let err = DependencyResolver::new(&[node("a"), node("a")], &[]).unwrap_err();
        assert!(matches!(err, ResolverError::DuplicateNodeId(id) if id == "a"));
    }

    #[test]
    fn edge_to_unknown_node_rejected() {
        let err =
            DependencyResolver::new(&[node("a")], &[edge("e1", "a", "ghost")]).unwrap_err();
        assert!(matches!(
            err,
            ResolverError::UnknownNodeReference { node_id, .. } if node_id == "ghost"
        ));
    }

    #[test]
    fn cycle_is_detected_with_witness() {
        let r = DependencyResolver::new(
            &[node("a"), node("b"), node("c")],
            &[edge("e1", "a", "b"), edge("e2", "b", "c"), edge("e3", "c", "a")],
        )
        .unwrap();

        assert!(r.has_cycle());
        let err = r.execution_plan().unwrap_err();
        match err {
            ResolverError::CyclicDependency { witness } => assert!(witness.len() >= 3),
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let r = DependencyResolver::new(&[node("a")], &[edge("e1", "a", "a")]).unwrap();
        assert!(r.has_cycle());
    }

    #[test]
    fn duplicate_edges_are_idempotent() {
        let r = DependencyResolver::new(
            &[node("a"), node("b")],
            &[edge("e1", "a", "b"), edge("e2", "a", "b")],
        )
        .unwrap();
        assert_eq!(r.dependents("a"), vec!["b"]);
    }

    #[test]
    fn disconnected_subgraphs_execute_independently() {
        let r = DependencyResolver::new(
            &[node("a"), node("b"), node("x"), node("y")],
            &[edge("e1", "a", "b"), edge("e2", "x", "y")],
        )
        .unwrap();
        let plan = r.execution_plan().unwrap();
        assert_eq!(plan.layers.len(), 2);
        assert_eq!(plan.layers[0].len(), 2);
        assert_eq!(plan.layers[1].len(), 2);
    }

    #[test]
    fn orphans_have_no_edges_at_all() {
        let r = DependencyResolver::new(
            &[node("a"), node("b"), node("solo")],
            &[edge("e1", "a", "b")],
        )
        .unwrap();
        assert_eq!(r.orphans(), vec!["solo"]);
    }

    #[test]
    fn ancestors_and_descendants_are_transitive() {
        let r = DependencyResolver::new(
            &[node("a"), node("b"), node("c")],
            &[edge("e1", "a", "b"), edge("e2", "b", "c")],
        )
        .unwrap();
        let ancestors = r.ancestors("c");
        assert!(ancestors.contains("a") && ancestors.contains("b"));
        let descendants = r.descendants("a");
        assert!(descendants.contains("b") && descendants.contains("c"));
    }

    #[test]
    fn empty_flow_produces_empty_plan() {
        let r = DependencyResolver::new(&[], &[]).unwrap();
        let plan = r.execution_plan().unwrap();
        assert!(plan.layers.is_empty());
        assert_eq!(plan.node_count(), 0);
    }
}
