//! `{{a.b.c}}` dotted-path template interpolation.
//!
//! Missing keys preserve the literal token, per spec — a template author
//! can always tell, by reading rendered output, which tokens failed to
//! resolve.

use serde_json::Value;

/// Interpolate every `{{a.b.c}}` token in `template` against `context`.
pub fn interpolate(template: &str, context: &Value) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < chars.len() {
        if i + 1 < chars.len() && chars[i] == '{' && chars[i + 1] == '{' {
            if let Some(close) = find_close(&chars, i + 2) {
                let token: String = chars[i + 2..close].iter().collect();
                let path = token.trim();
                match resolve_path(context, path) {
                    Some(value) => out.push_str(&value_to_plain_string(value)),
                    None => out.extend(&chars[i..close + 2]),
                }
                i = close + 2;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

fn find_close(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&j| chars[j] == '}' && chars[j + 1] == '}')
}

fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn value_to_plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_dotted_path() {
        let ctx = json!({ "node": { "id": "a", "label": "Step A" } });
        assert_eq!(interpolate("node {{node.id}}: {{node.label}}", &ctx), "node a: Step A");
    }

    #[test]
    fn missing_key_preserves_literal_token() {
        let ctx = json!({ "node": { "id": "a" } });
        assert_eq!(interpolate("{{node.missing}}", &ctx), "{{node.missing}}");
    }

    #[test]
    fn non_string_values_render_via_display() {
        let ctx = json!({ "input": { "count": 3 } });
        assert_eq!(interpolate("count={{input.count}}", &ctx), "count=3");
    }

    #[test]
    fn unterminated_token_is_passed_through_literally() {
        let ctx = json!({});
        assert_eq!(interpolate("a {{node.id", &ctx), "a {{node.id");
    }
}
