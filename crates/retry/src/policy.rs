//! `RetryPolicy` — should-retry decisions, backoff delay, and context enhancement.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::backoff::{apply_jitter, raw_delay, AdaptiveState, BackoffConfig, BackoffMode};
use crate::context::{compose_context, RetryContext, Suggestion};
use crate::error::ClassifiedError;

#[derive(Debug, Clone)]
struct AttemptRecord {
    #[allow(dead_code)]
    attempt: u32,
    error: ClassifiedError,
    #[allow(dead_code)]
    at: DateTime<Utc>,
}

/// Tracks per-node attempt history and adaptive backoff state, and decides
/// whether/when a node should be retried.
pub struct RetryPolicy {
    config: BackoffConfig,
    history: Mutex<HashMap<String, Vec<AttemptRecord>>>,
    adaptive: Mutex<HashMap<String, AdaptiveState>>,
}

impl RetryPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, history: Mutex::new(HashMap::new()), adaptive: Mutex::new(HashMap::new()) }
    }

    /// Decide whether `node_id`'s `attempt`-th failure (1-indexed, the
    /// attempt that just failed) should be retried, given `max_retries`
    /// from the node's config (I6: `attempts <= max_retries + 1`).
    pub fn should_retry(&self, node_id: &str, attempt: u32, max_retries: u32, error: &ClassifiedError) -> bool {
        self.record_attempt(node_id, attempt, error.clone());

        if !error.kind.is_retriable_class() {
            return false;
        }

        if attempt >= max_retries + 1 {
            return false;
        }

        if self.monotone_non_improvement(node_id) {
            tracing::info!(node_id, "retry stopped early: monotone non-improvement");
            return false;
        }

        true
    }

    /// Backoff delay before the next attempt, including jitter.
    pub fn delay_for(&self, node_id: &str, attempt: u32) -> Duration {
        let adaptive_state = if matches!(self.config.mode, BackoffMode::Adaptive) {
            let mut states = self.adaptive.lock().unwrap();
            Some(states.entry(node_id.to_string()).or_insert_with(|| AdaptiveState::new(&self.config)).clone())
        } else {
            None
        };

        let base = raw_delay(&self.config, attempt, adaptive_state.as_ref());
        apply_jitter(&self.config, base)
    }

    /// Feed the outcome of an attempt back into adaptive learning state.
    /// No-op for non-adaptive backoff modes.
    pub fn record_outcome(&self, node_id: &str, success: bool) {
        if !matches!(self.config.mode, BackoffMode::Adaptive) {
            return;
        }
        let mut states = self.adaptive.lock().unwrap();
        let state = states.entry(node_id.to_string()).or_insert_with(|| AdaptiveState::new(&self.config));
        state.record(success, &self.config);
    }

    /// Compose the `RetryContext` for the next attempt from this node's
    /// recorded history plus externally-sourced suggestions (e.g. extracted
    /// from review feedback).
    pub fn context_for(&self, node_id: &str, suggestions: &[Suggestion], environment: HashMap<String, String>) -> RetryContext {
        let history = self.history.lock().unwrap();
        let errors: Vec<ClassifiedError> =
            history.get(node_id).map(|records| records.iter().map(|r| r.error.clone()).collect()).unwrap_or_default();
        compose_context(&errors, suggestions, environment)
    }

    /// Drop all recorded state for a node (called when its flow tears down).
    pub fn forget(&self, node_id: &str) {
        self.history.lock().unwrap().remove(node_id);
        self.adaptive.lock().unwrap().remove(node_id);
    }

    fn record_attempt(&self, node_id: &str, attempt: u32, error: ClassifiedError) {
        let mut history = self.history.lock().unwrap();
        history.entry(node_id.to_string()).or_default().push(AttemptRecord { attempt, error, at: Utc::now() });
    }

    /// Three consecutive attempts with the same `(kind, signature)` stop retries early.
    fn monotone_non_improvement(&self, node_id: &str) -> bool {
        let history = self.history.lock().unwrap();
        let Some(records) = history.get(node_id) else { return false };
        if records.len() < 3 {
            return false;
        }
        let tail = &records[records.len() - 3..];
        let (kind, signature) = (tail[0].error.kind, tail[0].error.signature.as_str());
        tail.iter().all(|r| r.error.kind == kind && r.error.signature == signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(BackoffConfig { base_delay: Duration::from_millis(10), ..BackoffConfig::default() })
    }

    #[test]
    fn non_retriable_kinds_never_retry() {
        let p = policy();
        let err = ClassifiedError::new(ErrorKind::Assertion, "boom");
        assert!(!p.should_retry("n1", 1, 5, &err));
    }

    #[test]
    fn retriable_kinds_retry_until_max_retries_exhausted() {
        let p = policy();
        let err = ClassifiedError::new(ErrorKind::Timeout, "slow");
        assert!(p.should_retry("n1", 1, 2, &err));
        assert!(p.should_retry("n1", 2, 2, &err));
        assert!(!p.should_retry("n1", 3, 2, &err));
    }

    #[test]
    fn monotone_non_improvement_stops_retries_early() {
        let p = policy();
        let err = ClassifiedError::new(ErrorKind::Network, "same failure").with_signature("sig-a");
        assert!(p.should_retry("n1", 1, 10, &err));
        assert!(p.should_retry("n1", 2, 10, &err));
        // Third identical consecutive failure: stop even though budget remains.
        assert!(!p.should_retry("n1", 3, 10, &err));
    }

    #[test]
    fn different_signatures_do_not_trip_monotone_rule() {
        let p = policy();
        let e1 = ClassifiedError::new(ErrorKind::Network, "a").with_signature("sig-a");
        let e2 = ClassifiedError::new(ErrorKind::Network, "b").with_signature("sig-b");
        assert!(p.should_retry("n1", 1, 10, &e1));
        assert!(p.should_retry("n1", 2, 10, &e2));
        assert!(p.should_retry("n1", 3, 10, &e1));
    }

    #[test]
    fn delay_respects_jitter_bounds_around_base() {
        let p = policy();
        let d = p.delay_for("n1", 1);
        assert!(d.as_secs_f64() <= 0.011 && d.as_secs_f64() >= 0.0);
    }
}
