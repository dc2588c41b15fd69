//! Builds `modified_instructions` out of a completed review's feedback.

use regex::Regex;
use std::sync::OnceLock;

use crate::model::{ReviewFeedback, Severity};

fn suggestion_sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[^.!?\n]*\b(?:suggest|should|could|try|consider)\b[^.!?\n]*[.!?]?").unwrap()
    })
}

/// Extract imperative-sounding suggestion sentences from free-text comments,
/// deduplicated while preserving first-seen order.
pub fn extract_suggestions(comments: &[&str]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut suggestions = Vec::new();
    for comment in comments {
        for m in suggestion_sentence_re().find_iter(comment) {
            let trimmed = m.as_str().trim().to_string();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.clone()) {
                suggestions.push(trimmed);
            }
        }
    }
    suggestions
}

/// Compose a Markdown document combining critical feedback, action items,
/// and extracted suggestions, for use as retry instructions.
pub fn compose_modified_instructions(feedback: &[ReviewFeedback]) -> String {
    let mut doc = String::from("## Review feedback\n\n");

    let critical: Vec<&ReviewFeedback> = feedback.iter().filter(|f| f.severity == Severity::Error).collect();
    if !critical.is_empty() {
        doc.push_str("### Critical issues\n\n");
        for f in &critical {
            doc.push_str(&format!("- {}\n", f.comments));
        }
        doc.push('\n');
    }

    let action_items: Vec<&str> = feedback.iter().flat_map(|f| f.action_items.iter().map(String::as_str)).collect();
    if !action_items.is_empty() {
        doc.push_str("### Action items\n\n");
        let mut seen = std::collections::HashSet::new();
        for item in action_items {
            if seen.insert(item) {
                doc.push_str(&format!("- {item}\n"));
            }
        }
        doc.push('\n');
    }

    let comments: Vec<&str> = feedback.iter().map(|f| f.comments.as_str()).collect();
    let suggestions = extract_suggestions(&comments);
    if !suggestions.is_empty() {
        doc.push_str("### Suggestions\n\n");
        for s in &suggestions {
            doc.push_str(&format!("- {s}\n"));
        }
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn feedback(comments: &str, severity: Severity, action_items: Vec<&str>) -> ReviewFeedback {
        ReviewFeedback {
            feedback_id: Uuid::new_v4(),
            node_id: "n1".into(),
            reviewer_id: "r1".into(),
            decision: crate::model::ReviewDecision::RequestChanges,
            comments: comments.into(),
            action_items: action_items.into_iter().map(String::from).collect(),
            severity,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn extracts_imperative_suggestions() {
        let suggestions = extract_suggestions(&["You should add a null check. This part is fine otherwise."]);
        assert_eq!(suggestions, vec!["You should add a null check".to_string()]);
    }

    #[test]
    fn deduplicates_repeated_suggestions() {
        let suggestions =
            extract_suggestions(&["You should add logging.", "Elsewhere: you should add logging."]);
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn compose_includes_critical_feedback_and_action_items() {
        let feedback_list = vec![
            feedback("Null pointer risk here.", Severity::Error, vec!["Add bounds check"]),
            feedback("Consider renaming this variable.", Severity::Info, vec![]),
        ];
        let doc = compose_modified_instructions(&feedback_list);
        assert!(doc.contains("Critical issues"));
        assert!(doc.contains("Null pointer risk here."));
        assert!(doc.contains("Add bounds check"));
        assert!(doc.contains("Consider renaming this variable"));
    }
}
