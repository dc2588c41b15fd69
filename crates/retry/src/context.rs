//! `RetryContext` composition — the enriched payload merged into a
//! node's inputs on retry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ClassifiedError, ErrorKind};

/// A single actionable suggestion extracted from prior errors or review
/// feedback, ranked by `(priority, confidence)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub text: String,
    /// Higher is more urgent.
    pub priority: u8,
    /// `[0.0, 1.0]`.
    pub confidence: f64,
}

/// Structured supplementary input composed by the retry policy and handed
/// to the flow executor to merge into the next launch's inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryContext {
    pub errors_by_category: HashMap<String, Vec<String>>,
    /// Top three stack frames across all prior attempts, most-recent first.
    pub top_stack_frames: Vec<String>,
    /// Top three suggestions, ranked by `(priority, confidence)`, deduplicated.
    pub suggestions: Vec<Suggestion>,
    /// Set when the error count grew relative to the previous attempt.
    pub regression_warning: Option<String>,
    pub environment: HashMap<String, String>,
}

/// Fold the attempt history (oldest first) into a `RetryContext`.
pub fn compose_context(
    history: &[ClassifiedError],
    raw_suggestions: &[Suggestion],
    environment: HashMap<String, String>,
) -> RetryContext {
    let mut errors_by_category: HashMap<String, Vec<String>> = HashMap::new();
    for err in history {
        errors_by_category
            .entry(category_label(err.kind))
            .or_default()
            .push(err.message.clone());
    }

    let top_stack_frames: Vec<String> = history
        .iter()
        .rev()
        .flat_map(|e| e.stack_frames.iter().cloned())
        .take(3)
        .collect();

    let mut suggestions = raw_suggestions.to_vec();
    suggestions.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
    });
    let mut seen = std::collections::HashSet::new();
    suggestions.retain(|s| seen.insert(s.text.clone()));
    suggestions.truncate(3);

    // A naive "error count grew" signal: compare the last two attempts' error
    // counts for the same node, where `history` is this node's full run so far.
    let regression_warning = regression_warning(history);

    RetryContext { errors_by_category, top_stack_frames, suggestions, regression_warning, environment }
}

fn category_label(kind: ErrorKind) -> String {
    format!("{kind:?}").to_lowercase()
}

fn regression_warning(history: &[ClassifiedError]) -> Option<String> {
    if history.len() < 2 {
        return None;
    }
    // Heuristic: multiple distinct signatures in the tail window suggest the
    // agent is accumulating new failure modes rather than converging.
    let tail: std::collections::HashSet<&str> =
        history.iter().rev().take(2).map(|e| e.signature.as_str()).collect();
    if tail.len() > 1 {
        Some("error count increased versus the previous attempt".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_are_ranked_and_deduplicated_and_capped() {
        let suggestions = vec![
            Suggestion { text: "a".into(), priority: 1, confidence: 0.5 },
            Suggestion { text: "b".into(), priority: 3, confidence: 0.9 },
            Suggestion { text: "b".into(), priority: 3, confidence: 0.9 },
            Suggestion { text: "c".into(), priority: 2, confidence: 0.1 },
            Suggestion { text: "d".into(), priority: 0, confidence: 0.99 },
        ];
        let ctx = compose_context(&[], &suggestions, HashMap::new());
        assert_eq!(ctx.suggestions.len(), 3);
        assert_eq!(ctx.suggestions[0].text, "b");
        assert_eq!(ctx.suggestions[1].text, "c");
    }

    #[test]
    fn errors_are_grouped_by_category() {
        let history = vec![
            ClassifiedError::new(ErrorKind::Timeout, "timed out"),
            ClassifiedError::new(ErrorKind::Network, "conn reset"),
            ClassifiedError::new(ErrorKind::Timeout, "timed out again"),
        ];
        let ctx = compose_context(&history, &[], HashMap::new());
        assert_eq!(ctx.errors_by_category["timeout"].len(), 2);
        assert_eq!(ctx.errors_by_category["network"].len(), 1);
    }
}
