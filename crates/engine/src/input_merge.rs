//! Gathers a node's launch-time input by merging upstream edge outputs with
//! its own declared defaults.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::models::{Edge, Node};

/// For every incoming edge `(s,h_s)→(t,h_t)`: read `outputs[s]`; if `h_s` is
/// present, select that field; if `h_t` is present, place at `inputs[h_t]`,
/// else shallow-merge into the root. Finally overlay the node's declared
/// `inputs` — declared defaults fill gaps the edges left, never overwrite a
/// value an edge supplied.
pub fn merge_inputs(node: &Node, edges: &[Edge], outputs: &HashMap<String, Value>) -> Value {
    let mut merged = Map::new();

    for edge in edges.iter().filter(|e| e.target_node_id == node.id) {
        let Some(source_output) = outputs.get(&edge.source_node_id) else { continue };

        let value = match &edge.source_handle {
            Some(handle) => source_output.get(handle).cloned().unwrap_or(Value::Null),
            None => source_output.clone(),
        };

        match &edge.target_handle {
            Some(handle) => {
                merged.insert(handle.clone(), value);
            }
            None => {
                if let Value::Object(obj) = value {
                    for (k, v) in obj {
                        merged.insert(k, v);
                    }
                }
            }
        }
    }

    for (key, default_value) in &node.inputs {
        merged.entry(key.clone()).or_insert_with(|| default_value.clone());
    }

    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, inputs: HashMap<String, Value>) -> Node {
        Node {
            id: id.into(),
            agent_id: "a".into(),
            label: id.into(),
            instructions: String::new(),
            inputs,
            position: Value::Null,
            config: Default::default(),
        }
    }

    fn edge(source: &str, target: &str, source_handle: Option<&str>, target_handle: Option<&str>) -> Edge {
        Edge {
            edge_id: format!("{source}-{target}"),
            source_node_id: source.into(),
            target_node_id: target.into(),
            source_handle: source_handle.map(String::from),
            target_handle: target_handle.map(String::from),
        }
    }

    #[test]
    fn shallow_merges_whole_output_when_no_handles() {
        let n = node("b", HashMap::new());
        let edges = vec![edge("a", "b", None, None)];
        let mut outputs = HashMap::new();
        outputs.insert("a".to_string(), json!({ "x": 1, "y": 2 }));

        let merged = merge_inputs(&n, &edges, &outputs);
        assert_eq!(merged, json!({ "x": 1, "y": 2 }));
    }

    #[test]
    fn selects_source_handle_and_places_under_target_handle() {
        let n = node("b", HashMap::new());
        let edges = vec![edge("a", "b", Some("result"), Some("payload"))];
        let mut outputs = HashMap::new();
        outputs.insert("a".to_string(), json!({ "result": "ok", "other": "x" }));

        let merged = merge_inputs(&n, &edges, &outputs);
        assert_eq!(merged, json!({ "payload": "ok" }));
    }

    #[test]
    fn declared_inputs_fill_gaps_but_never_override_edges() {
        let mut defaults = HashMap::new();
        defaults.insert("x".to_string(), json!("default-x"));
        defaults.insert("z".to_string(), json!("default-z"));
        let n = node("b", defaults);
        let edges = vec![edge("a", "b", None, None)];
        let mut outputs = HashMap::new();
        outputs.insert("a".to_string(), json!({ "x": "from-edge" }));

        let merged = merge_inputs(&n, &edges, &outputs);
        assert_eq!(merged["x"], json!("from-edge"));
        assert_eq!(merged["z"], json!("default-z"));
    }
}
