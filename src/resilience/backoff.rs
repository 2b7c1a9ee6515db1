//! Backoff Policy
//!
//! Doubling delay schedule shared by every retry loop.

use std::time::Duration;

/// Default base delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default maximum attempts, first attempt included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Exponential backoff: `base * 2^(attempt - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt.
    pub base: Duration,
    /// Maximum number of attempts.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with a custom base and attempt limit.
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self { base, max_attempts }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base.saturating_mul(1u32 << exponent)
    }

    /// Whether another attempt is allowed after `attempt`.
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
