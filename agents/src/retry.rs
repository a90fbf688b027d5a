//! Reconnect backoff for the driver agents.
//!
//! # Policy
//!
//! - Initial delay: 2 seconds
//! - Max delay: 5 seconds
//! - Jitter: down-jitter up to 25% (multiplier in [0.75, 1.0])
//! - No limit on consecutive failures unless one is configured

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Give up after this many failed rounds in a row. `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
    /// Backoff before the first retry.
    pub initial_delay: Duration,
    /// Maximum backoff delay.
    pub max_delay: Duration,
    /// Jitter factor for down-jitter (0.25 = up to 25% reduction).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: None,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    /// Whether `failures` consecutive failures exhaust the budget.
    #[must_use]
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_consecutive_failures
            .is_some_and(|max| failures >= max)
    }
}

/// Delay before retry number `backoff_step` (0-based).
///
/// Exponential from `initial_delay`, capped at `max_delay`, then scaled by a
/// random multiplier in `[1 - jitter_factor, 1.0]`.
#[must_use]
pub fn calculate_retry_delay(backoff_step: u32, config: &RetryConfig) -> Duration {
    let base_delay = config
        .initial_delay
        .saturating_mul(2u32.saturating_pow(backoff_step));
    let capped_delay = base_delay.min(config.max_delay);

    let jitter_factor = config.jitter_factor.clamp(0.0, 1.0);
    let jitter = 1.0 - rand::random::<f64>() * jitter_factor;
    let delay = capped_delay.mul_f64(jitter);

    tracing::debug!(
        backoff_step,
        delay_ms = delay.as_millis(),
        "Calculated reconnect delay"
    );
    delay
}
