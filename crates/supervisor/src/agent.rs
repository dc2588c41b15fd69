//! Local representation of an `AgentDefinition` fetched from the (external,
//! out-of-scope) agent registry. The registry itself is someone else's
//! problem; the supervisor only needs this much of it to materialize a
//! project directory and launch a subprocess.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionsTemplate {
    pub base: String,
    #[serde(default)]
    pub contextual: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub agent_id: String,
    pub category: String,
    pub instructions_template: InstructionsTemplate,
    #[serde(default)]
    pub declared_inputs: Vec<String>,
    #[serde(default)]
    pub declared_outputs: Vec<String>,
    #[serde(default)]
    pub claude_md: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}
