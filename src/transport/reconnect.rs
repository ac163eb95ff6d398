//! Reconnect backoff policy.
//!
//! Pure computation of reconnect delays; scheduling lives in the manager.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2000);

/// Default number of reconnect attempts per outage.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Exponential backoff: `delay(n) = base_delay * 2^n`.
///
/// Attempts are counted from zero per outage and reset once a session
/// opens successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS)
    }
}

impl ReconnectPolicy {
    /// Creates a policy.
    #[inline]
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Policy that never reconnects.
    #[inline]
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(DEFAULT_BASE_DELAY, 0)
    }

    /// Delay before the first attempt.
    #[inline]
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Attempts allowed per outage.
    #[inline]
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt number `attempt` (zero-based).
    ///
    /// Saturates instead of overflowing.
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Returns `true` if attempt number `attempt` may run.
    #[inline]
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay for `attempt`, or `None` once attempts are exhausted.
    #[inline]
    #[must_use]
    pub fn schedule(&self, attempt: u32) -> Option<Duration> {
        self.should_retry(attempt).then(|| self.next_delay(attempt))
    }
}

// ============================================================================
// Tests
// ============================================================================
