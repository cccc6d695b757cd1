//! Bounded retry policy with exponential backoff.
//!
//! Retries are always at the discretion of the calling node — the graph
//! engine never retries a stage itself. Exceeding `max_attempts` surfaces as
//! the caller's own error type.

use std::time::Duration;

/// Retry policy: attempt cap plus exponential backoff bounds.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first). Never zero.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry number `attempt` (1-based: the delay after
    /// the first failure is `backoff_delay(1)`). Doubles per attempt, capped
    /// at `max_delay`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1_u32 << exp);
        delay.min(self.max_delay)
    }
}
