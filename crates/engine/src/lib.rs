//! `engine` crate — flow domain models, hook routing, and the executor
//! that drives a flow from dispatch through completion.

pub mod error;
pub mod executor;
pub mod input_merge;
pub mod models;
pub mod registry;

pub use error::EngineError;
pub use executor::{FlowExecutor, FlowExecutorConfig};
pub use models::{Edge, ExecutionState, Flow, FlowStatus, Node, NodeConfig, NodeExecutionState, NodeStatus};
pub use registry::OrchestratorRegistry;
