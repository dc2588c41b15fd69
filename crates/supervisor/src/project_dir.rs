//! Per-instance project directory materialization.
//!
//! Layout under `<root>/<flow_id>/<node_id>/`:
//! - `instructions.md`    — base + node instructions + contextual template, plus the
//!                          "write results to output.json" directive.
//! - `.claude/hooks.json`  — registers the stop / post-write / error triggers.
//! - `hooks/*.sh`          — executable scripts that POST to the hook ingress.
//! - `input.json`          — serialized input, written only if non-empty.
//! - `.claude/claude.md`   — optional rendered agent context.

use std::path::PathBuf;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::agent::AgentDefinition;
use crate::error::SupervisorError;
use crate::template::interpolate;

pub struct ProjectDirInputs<'a> {
    pub node_id: &'a str,
    pub node_label: &'a str,
    pub node_instructions: &'a str,
    pub agent: &'a AgentDefinition,
    pub input_data: &'a Value,
    pub hook_base_url: &'a str,
}

pub async fn materialize(
    root: &std::path::Path,
    flow_id: Uuid,
    inputs: ProjectDirInputs<'_>,
) -> Result<PathBuf, SupervisorError> {
    let project_dir = root.join(flow_id.to_string()).join(inputs.node_id);
    tokio::fs::create_dir_all(&project_dir).await?;
    tokio::fs::create_dir_all(project_dir.join(".claude")).await?;
    tokio::fs::create_dir_all(project_dir.join("hooks")).await?;

    let context = json!({
        "node": { "id": inputs.node_id, "label": inputs.node_label },
        "input_data": inputs.input_data,
    });

    let contextual = interpolate(&inputs.agent.instructions_template.contextual, &context);
    let instructions = format!(
        "{base}\n\n{node_instructions}\n\n{contextual}\n\nWrite your final result to `output.json` in this directory before finishing.\n",
        base = inputs.agent.instructions_template.base,
        node_instructions = inputs.node_instructions,
        contextual = contextual,
    );
    tokio::fs::write(project_dir.join("instructions.md"), instructions).await?;

    let hooks_json = json!({
        "hooks": {
            "stop": [{ "type": "command", "command": "bash hooks/stop.sh" }],
            "post-write": [{ "type": "command", "command": "bash hooks/track-changes.sh" }],
            "error": [{ "type": "command", "command": "bash hooks/error.sh" }],
        }
    });
    tokio::fs::write(
        project_dir.join(".claude").join("hooks.json"),
        serde_json::to_vec_pretty(&hooks_json)?,
    )
    .await?;

    write_script(
        &project_dir.join("hooks").join("stop.sh"),
        &stop_script(inputs.hook_base_url, inputs.node_id),
    )
    .await?;
    write_script(
        &project_dir.join("hooks").join("track-changes.sh"),
        &track_changes_script(inputs.hook_base_url, inputs.node_id),
    )
    .await?;
    write_script(
        &project_dir.join("hooks").join("error.sh"),
        &error_script(inputs.hook_base_url, inputs.node_id),
    )
    .await?;

    let is_empty_input = matches!(inputs.input_data, Value::Null)
        || inputs.input_data.as_object().map(serde_json::Map::is_empty).unwrap_or(false);
    if !is_empty_input {
        tokio::fs::write(project_dir.join("input.json"), serde_json::to_vec_pretty(inputs.input_data)?).await?;
    }

    if let Some(claude_md) = &inputs.agent.claude_md {
        tokio::fs::write(project_dir.join(".claude").join("claude.md"), interpolate(claude_md, &context)).await?;
    }

    Ok(project_dir)
}

#[cfg(unix)]
async fn write_script(path: &std::path::Path, content: &str) -> Result<(), SupervisorError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::write(path, content).await?;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn write_script(path: &std::path::Path, content: &str) -> Result<(), SupervisorError> {
    tokio::fs::write(path, content).await?;
    Ok(())
}

fn stop_script(hook_base_url: &str, node_id: &str) -> String {
    format!(
        r#"#!/usr/bin/env bash
set -euo pipefail
OUTPUT="{{}}"
if [ -f output.json ]; then OUTPUT=$(cat output.json); fi
curl -sS -X POST "{hook_base_url}/agent-complete" \
  -H 'Content-Type: application/json' \
  -d "{{\"node_id\":\"{node_id}\",\"status\":\"completed\",\"output\":$OUTPUT,\"timestamp\":$(date +%s)}}" \
  >/dev/null || true
"#
    )
}

fn track_changes_script(hook_base_url: &str, node_id: &str) -> String {
    format!(
        r#"#!/usr/bin/env bash
set -euo pipefail
FILES_JSON=$(printf '%s\n' "$@" | jq -R . | jq -s .)
curl -sS -X POST "{hook_base_url}/file-changed" \
  -H 'Content-Type: application/json' \
  -d "{{\"node_id\":\"{node_id}\",\"files\":$FILES_JSON,\"timestamp\":$(date +%s)}}" \
  >/dev/null || true
"#
    )
}

fn error_script(hook_base_url: &str, node_id: &str) -> String {
    format!(
        r#"#!/usr/bin/env bash
set -euo pipefail
ERROR_MSG="${{1:-unknown error}}"
curl -sS -X POST "{hook_base_url}/agent-error" \
  -H 'Content-Type: application/json' \
  -d "{{\"node_id\":\"{node_id}\",\"error\":$(printf '%s' "$ERROR_MSG" | jq -Rs .),\"timestamp\":$(date +%s)}}" \
  >/dev/null || true
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn materialize_writes_expected_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let flow_id = Uuid::new_v4();
        let agent = AgentDefinition {
            agent_id: "writer".into(),
            category: "content".into(),
            instructions_template: crate::agent::InstructionsTemplate {
                base: "You are a writer.".into(),
                contextual: "Context: {{input_data.topic}}".into(),
            },
            declared_inputs: vec![],
            declared_outputs: vec![],
            claude_md: Some("Repo notes for {{node.label}}".into()),
            metadata: json!({}),
        };
        let input = json!({ "topic": "rust" });

        let dir = materialize(
            tmp.path(),
            flow_id,
            ProjectDirInputs {
                node_id: "n1",
                node_label: "Write intro",
                node_instructions: "Write a short intro.",
                agent: &agent,
                input_data: &input,
                hook_base_url: "http://127.0.0.1:9000",
            },
        )
        .await
        .unwrap();

        assert!(dir.join("instructions.md").exists());
        let instructions = tokio::fs::read_to_string(dir.join("instructions.md")).await.unwrap();
        assert!(instructions.contains("Context: rust"));
        assert!(instructions.contains("output.json"));

        assert!(dir.join(".claude/hooks.json").exists());
        assert!(dir.join("hooks/stop.sh").exists());
        assert!(dir.join("input.json").exists());
        let claude_md = tokio::fs::read_to_string(dir.join(".claude/claude.md")).await.unwrap();
        assert_eq!(claude_md, "Repo notes for Write intro");
    }

    #[tokio::test]
    async fn empty_input_does_not_write_input_json() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = AgentDefinition {
            agent_id: "a".into(),
            category: "c".into(),
            instructions_template: crate::agent::InstructionsTemplate { base: "base".into(), contextual: String::new() },
            declared_inputs: vec![],
            declared_outputs: vec![],
            claude_md: None,
            metadata: json!({}),
        };
        let dir = materialize(
            tmp.path(),
            Uuid::new_v4(),
            ProjectDirInputs {
                node_id: "n1",
                node_label: "n",
                node_instructions: "do thing",
                agent: &agent,
                input_data: &json!({}),
                hook_base_url: "http://x",
            },
        )
        .await
        .unwrap();
        assert!(!dir.join("input.json").exists());
    }
}
