//! Backoff delay computation for the four supported modes.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Selectable backoff strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BackoffMode {
    Linear,
    Exponential,
    Fibonacci,
    Adaptive,
}

/// Static tuning shared by every backoff mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    pub mode: BackoffMode,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Jitter half-width as a fraction of the computed delay (spec: ±10%, i.e. 0.1).
    pub jitter_ratio: f64,
    /// Adaptive-mode learning rate `α ∈ (0,1]`.
    pub adaptive_learning_rate: f64,
    /// Adaptive-mode shrink/grow factors, scaled by `adaptive_learning_rate`.
    pub adaptive_bonus: f64,
    pub adaptive_penalty: f64,
    pub min_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            mode: BackoffMode::Exponential,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            jitter_ratio: 0.1,
            adaptive_learning_rate: 0.3,
            adaptive_bonus: 0.5,
            adaptive_penalty: 1.0,
            min_delay: Duration::from_millis(100),
        }
    }
}

/// Per-node adaptive state: an EMA of success rate and the current delay.
#[derive(Debug, Clone)]
pub struct AdaptiveState {
    pub success_rate_ema: f64,
    pub current_delay: Duration,
}

impl AdaptiveState {
    pub fn new(config: &BackoffConfig) -> Self {
        Self { success_rate_ema: 0.5, current_delay: config.base_delay }
    }

    /// Fold in the outcome of the most recent attempt, shrinking the delay
    /// on success and growing it on failure.
    pub fn record(&mut self, success: bool, config: &BackoffConfig) {
        let alpha = config.adaptive_learning_rate;
        let observed = if success { 1.0 } else { 0.0 };
        self.success_rate_ema = self.success_rate_ema * (1.0 - alpha) + observed * alpha;

        let factor = if success {
            1.0 - config.adaptive_bonus * alpha
        } else {
            1.0 + config.adaptive_penalty * alpha
        };
        let scaled = self.current_delay.as_secs_f64() * factor;
        let clamped = scaled.clamp(config.min_delay.as_secs_f64(), config.max_delay.as_secs_f64());
        self.current_delay = Duration::from_secs_f64(clamped);
    }
}

/// `fib(1) = 1, fib(2) = 1, fib(n) = fib(n-1) + fib(n-2)`.
fn fib(n: u32) -> u64 {
    if n == 0 {
        return 0;
    }
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

/// Compute the un-jittered delay for a bare backoff mode at `attempt`
/// (1-indexed: the attempt that just failed). `adaptive` carries the
/// per-node learned state for [`BackoffMode::Adaptive`]; ignored otherwise.
pub fn raw_delay(config: &BackoffConfig, attempt: u32, adaptive: Option<&AdaptiveState>) -> Duration {
    let attempt = attempt.max(1);
    let base_ms = config.base_delay.as_millis() as f64;

    let computed_ms = match config.mode {
        BackoffMode::Linear => base_ms * attempt as f64,
        BackoffMode::Exponential => base_ms * 2f64.powi(attempt as i32 - 1),
        BackoffMode::Fibonacci => base_ms * fib(attempt) as f64,
        BackoffMode::Adaptive => {
            return adaptive
                .map(|s| s.current_delay)
                .unwrap_or(config.base_delay);
        }
    };

    Duration::from_millis(computed_ms.min(config.max_delay.as_millis() as f64) as u64)
}

/// Apply uniform ±`jitter_ratio` jitter and cap at `max_delay`.
pub fn apply_jitter(config: &BackoffConfig, delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter = rng.gen_range(-config.jitter_ratio..=config.jitter_ratio);
    let jittered_secs = (delay.as_secs_f64() * (1.0 + jitter)).max(0.0);
    let capped = jittered_secs.min(config.max_delay.as_secs_f64());
    Duration::from_secs_f64(capped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: BackoffMode) -> BackoffConfig {
        BackoffConfig { mode, base_delay: Duration::from_millis(100), ..BackoffConfig::default() }
    }

    #[test]
    fn linear_grows_by_multiples_of_base() {
        let c = config(BackoffMode::Linear);
        assert_eq!(raw_delay(&c, 1, None), Duration::from_millis(100));
        assert_eq!(raw_delay(&c, 3, None), Duration::from_millis(300));
    }

    #[test]
    fn exponential_doubles_each_attempt() {
        let c = config(BackoffMode::Exponential);
        assert_eq!(raw_delay(&c, 1, None), Duration::from_millis(100));
        assert_eq!(raw_delay(&c, 2, None), Duration::from_millis(200));
        assert_eq!(raw_delay(&c, 4, None), Duration::from_millis(800));
    }

    #[test]
    fn fibonacci_follows_fib_sequence() {
        let c = config(BackoffMode::Fibonacci);
        assert_eq!(raw_delay(&c, 1, None), Duration::from_millis(100));
        assert_eq!(raw_delay(&c, 2, None), Duration::from_millis(100));
        assert_eq!(raw_delay(&c, 5, None), Duration::from_millis(500));
    }

    #[test]
    fn delay_is_capped_at_max_delay() {
        let mut c = config(BackoffMode::Exponential);
        c.max_delay = Duration::from_millis(250);
        assert_eq!(raw_delay(&c, 10, None), Duration::from_millis(250));
    }

    #[test]
    fn jitter_stays_within_ratio_bounds() {
        let c = config(BackoffMode::Linear);
        let base = raw_delay(&c, 2, None);
        for _ in 0..50 {
            let jittered = apply_jitter(&c, base);
            let lower = base.as_secs_f64() * 0.9;
            let upper = base.as_secs_f64() * 1.1 + 1e-9;
            assert!(jittered.as_secs_f64() >= lower && jittered.as_secs_f64() <= upper);
        }
    }

    #[test]
    fn adaptive_state_shrinks_on_success_grows_on_failure() {
        let c = config(BackoffMode::Adaptive);
        let mut state = AdaptiveState::new(&c);
        let start = state.current_delay;
        state.record(true, &c);
        assert!(state.current_delay <= start);

        let mut state2 = AdaptiveState::new(&c);
        let start2 = state2.current_delay;
        state2.record(false, &c);
        assert!(state2.current_delay >= start2);
    }
}
