//! Subprocess supervision for agent instances: project directory
//! materialization, process lifecycle, and bounded log capture.

mod agent;
mod error;
mod instance;
mod project_dir;
mod supervisor;
mod template;

pub use agent::{AgentDefinition, InstructionsTemplate};
pub use error::SupervisorError;
pub use instance::{AgentInstanceView, InstanceMetrics, InstanceStatus, LogLine, StreamTag};
pub use project_dir::ProjectDirInputs;
pub use supervisor::{SpawnRequest, Supervisor, SupervisorEvent};
pub use template::interpolate;
