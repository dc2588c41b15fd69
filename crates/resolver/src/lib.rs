//! `resolver` crate — DAG validation and layered scheduling for flows.
//!
//! Given a flow's node IDs and edges, this crate:
//! 1. Validates structural invariants (unique IDs, edges reference real
//!    nodes).
//! 2. Detects cycles via Kahn's algorithm, reporting one witness cycle.
//! 3. Produces a [`plan::ExecutionPlan`] of layers, where layer `k`
//!    contains every node whose deepest ancestor depth is `k` (I7).
//! 4. Answers ancestor/descendant queries used by the flow executor's
//!    cascade-skip logic.

pub mod error;
pub mod plan;
mod resolver;

pub use error::ResolverError;
pub use plan::{ExecutionPlan, Layer};
pub use resolver::{DependencyResolver, GraphEdge, GraphNode};
