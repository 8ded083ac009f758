//! Rate limit policies and decisions.

use crate::rate_limits::RateLimitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl RateLimitPolicy {
    #[must_use]
    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    /// Start of the fixed window containing `now_ms`.
    ///
    /// A zero-length window is treated as one millisecond wide.
    #[must_use]
    pub fn window_start(&self, now_ms: i64) -> i64 {
        let window = i64::try_from(self.window_ms.max(1)).unwrap_or(i64::MAX);

        now_ms.div_euclid(window) * window
    }

    /// Milliseconds until the window starting at `window_start` closes.
    #[must_use]
    pub fn reset_ms(&self, window_start: i64, now_ms: i64) -> u64 {
        let window = i64::try_from(self.window_ms.max(1)).unwrap_or(i64::MAX);
        let remaining = window_start.saturating_add(window).saturating_sub(now_ms);

        u64::try_from(remaining).unwrap_or(0)
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_ms: u64,

    /// The store could not be consulted and the request was let through.
    pub degraded: bool,
}

impl RateLimitDecision {
    #[must_use]
    pub fn allow(policy: RateLimitPolicy, count: u32, reset_ms: u64) -> Self {
        Self {
            allowed: true,
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(count),
            reset_ms,
            degraded: false,
        }
    }

    #[must_use]
    pub fn deny(policy: RateLimitPolicy, reset_ms: u64) -> Self {
        Self {
            allowed: false,
            limit: policy.max_requests,
            remaining: 0,
            reset_ms,
            degraded: false,
        }
    }

    /// Fail-open decision: allowed with the whole quota reported as remaining.
    #[must_use]
    pub fn fail_open(policy: RateLimitPolicy) -> Self {
        Self {
            allowed: true,
            limit: policy.max_requests,
            remaining: policy.max_requests,
            reset_ms: policy.window_ms,
            degraded: true,
        }
    }

    /// Whole seconds a denied caller should wait, rounded up.
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_ms.div_ceil(1_000)
    }

    /// Convert a denial into [`RateLimitError::RateLimited`].
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::RateLimited`] when the request was not allowed.
    pub fn enforce(self) -> Result<Self, RateLimitError> {
        if self.allowed {
            Ok(self)
        } else {
            Err(RateLimitError::RateLimited {
                reset_ms: self.reset_ms,
            })
        }
    }
}
