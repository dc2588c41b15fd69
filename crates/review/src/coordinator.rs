//! The `ReviewCoordinator`: owns every in-flight [`ReviewRequest`] and
//! advances it to a [`ReviewResult`] as feedback (or a timeout) arrives.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::info;

use crate::error::ReviewError;
use crate::model::{FinalDecision, ReviewDecision, ReviewFeedback, ReviewRequest, ReviewResult, ReviewStatus};
use crate::synthesis::compose_modified_instructions;

struct OpenReview {
    request: ReviewRequest,
    feedback: Vec<ReviewFeedback>,
}

/// Exclusive owner of in-flight review requests, per the data model's
/// ownership rule.
#[derive(Default)]
pub struct ReviewCoordinator {
    open: Mutex<HashMap<String, OpenReview>>,
    history: Mutex<HashMap<String, Vec<ReviewResult>>>,
}

impl ReviewCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_request(&self, request: ReviewRequest) {
        let node_id = request.node_id.clone();
        info!(node_id, flow_id = %request.flow_id, "opened review request");
        let mut open = self.open.lock().expect("review lock poisoned");
        open.insert(node_id, OpenReview { request, feedback: Vec::new() });
    }

    pub fn is_open(&self, node_id: &str) -> bool {
        self.open.lock().expect("review lock poisoned").contains_key(node_id)
    }

    /// Submit feedback for a node's open review. Returns `Some(result)` once
    /// the feedback completes the request; `None` if still awaiting more.
    pub fn submit_feedback(&self, feedback: ReviewFeedback) -> Result<Option<ReviewResult>, ReviewError> {
        let mut open = self.open.lock().expect("review lock poisoned");
        let entry = open
            .get_mut(&feedback.node_id)
            .ok_or_else(|| ReviewError::UnknownRequest(feedback.node_id.clone()))?;

        let node_id = feedback.node_id.clone();
        entry.feedback.push(feedback);

        let outcome = match Self::completion_outcome(entry) {
            Some((status, decision)) => {
                let open_review = open.remove(&node_id).expect("just matched above");
                Some(self.finalize(open_review, status, decision))
            }
            None => None,
        };

        if let Some(result) = &outcome {
            self.record_history(result.clone());
        }
        Ok(outcome)
    }

    /// Called by the executor's timeout watchdog when `timeout_ms` elapses
    /// with the request still open.
    pub fn expire(&self, node_id: &str) -> Result<ReviewResult, ReviewError> {
        let mut open = self.open.lock().expect("review lock poisoned");
        let open_review = open.remove(node_id).ok_or_else(|| ReviewError::UnknownRequest(node_id.to_string()))?;
        let requires_approval = open_review.request.requires_approval;
        let decision = if requires_approval { FinalDecision::Abort } else { FinalDecision::Continue };
        let result = self.finalize(open_review, ReviewStatus::Timeout, decision);
        self.record_history(result.clone());
        Ok(result)
    }

    pub fn history_for(&self, node_id: &str) -> Vec<ReviewResult> {
        self.history.lock().expect("review history lock poisoned").get(node_id).cloned().unwrap_or_default()
    }

    fn completion_outcome(entry: &OpenReview) -> Option<(ReviewStatus, FinalDecision)> {
        if entry.feedback.iter().any(|f| f.decision == ReviewDecision::Reject) {
            return Some((ReviewStatus::Rejected, FinalDecision::Abort));
        }
        if entry.feedback.iter().any(|f| f.decision == ReviewDecision::RequestChanges) {
            return Some((ReviewStatus::ChangesRequested, FinalDecision::Retry));
        }
        let approvals = entry.feedback.iter().filter(|f| f.decision == ReviewDecision::Approve).count() as u32;
        if approvals >= entry.request.required_approvals {
            return Some((ReviewStatus::Approved, FinalDecision::Continue));
        }
        None
    }

    fn finalize(&self, open_review: OpenReview, status: ReviewStatus, final_decision: FinalDecision) -> ReviewResult {
        let node_id = open_review.request.node_id.clone();
        let feedback = open_review.feedback;

        let (modified_instructions, retry_context) = if final_decision == FinalDecision::Retry {
            (Some(compose_modified_instructions(&feedback)), Some(feedback.clone()))
        } else {
            (None, None)
        };

        info!(node_id, ?status, ?final_decision, "review request completed");

        ReviewResult { node_id, status, feedback, final_decision, modified_instructions, retry_context }
    }

    fn record_history(&self, result: ReviewResult) {
        let mut history = self.history.lock().expect("review history lock poisoned");
        history.entry(result.node_id.clone()).or_default().push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn request(node_id: &str, required_approvals: u32, requires_approval: bool) -> ReviewRequest {
        ReviewRequest {
            node_id: node_id.into(),
            flow_id: Uuid::new_v4(),
            scope: crate::model::ReviewScope::Full,
            files: None,
            criteria: None,
            timeout_ms: Some(60_000),
            requires_approval,
            required_approvals,
            metadata: json!({}),
            opened_at: Utc::now(),
        }
    }

    fn feedback(node_id: &str, decision: ReviewDecision) -> ReviewFeedback {
        ReviewFeedback {
            feedback_id: Uuid::new_v4(),
            node_id: node_id.into(),
            reviewer_id: "r1".into(),
            decision,
            comments: "looks fine".into(),
            action_items: vec![],
            severity: Severity::Info,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn single_reject_completes_as_rejected_abort() {
        let coordinator = ReviewCoordinator::new();
        coordinator.open_request(request("n1", 2, true));
        let result = coordinator.submit_feedback(feedback("n1", ReviewDecision::Reject)).unwrap().unwrap();
        assert_eq!(result.status, ReviewStatus::Rejected);
        assert_eq!(result.final_decision, FinalDecision::Abort);
        assert!(!coordinator.is_open("n1"));
    }

    #[test]
    fn single_request_changes_completes_as_retry() {
        let coordinator = ReviewCoordinator::new();
        coordinator.open_request(request("n1", 2, true));
        let result = coordinator.submit_feedback(feedback("n1", ReviewDecision::RequestChanges)).unwrap().unwrap();
        assert_eq!(result.status, ReviewStatus::ChangesRequested);
        assert_eq!(result.final_decision, FinalDecision::Retry);
        assert!(result.modified_instructions.is_some());
    }

    #[test]
    fn requires_required_approvals_before_completing() {
        let coordinator = ReviewCoordinator::new();
        coordinator.open_request(request("n1", 2, true));
        let first = coordinator.submit_feedback(feedback("n1", ReviewDecision::Approve)).unwrap();
        assert!(first.is_none());
        assert!(coordinator.is_open("n1"));

        let second = coordinator.submit_feedback(feedback("n1", ReviewDecision::Approve)).unwrap().unwrap();
        assert_eq!(second.status, ReviewStatus::Approved);
        assert_eq!(second.final_decision, FinalDecision::Continue);
    }

    #[test]
    fn expire_without_required_approval_continues() {
        let coordinator = ReviewCoordinator::new();
        coordinator.open_request(request("n1", 1, false));
        let result = coordinator.expire("n1").unwrap();
        assert_eq!(result.status, ReviewStatus::Timeout);
        assert_eq!(result.final_decision, FinalDecision::Continue);
    }

    #[test]
    fn expire_with_required_approval_aborts() {
        let coordinator = ReviewCoordinator::new();
        coordinator.open_request(request("n1", 1, true));
        let result = coordinator.expire("n1").unwrap();
        assert_eq!(result.final_decision, FinalDecision::Abort);
    }

    #[test]
    fn history_accumulates_completed_results() {
        let coordinator = ReviewCoordinator::new();
        coordinator.open_request(request("n1", 1, true));
        coordinator.submit_feedback(feedback("n1", ReviewDecision::Reject)).unwrap();
        assert_eq!(coordinator.history_for("n1").len(), 1);
    }

    #[test]
    fn unknown_node_is_an_error() {
        let coordinator = ReviewCoordinator::new();
        let result = coordinator.submit_feedback(feedback("ghost", ReviewDecision::Approve));
        assert_eq!(result, Err(ReviewError::UnknownRequest("ghost".into())));
    }
}
