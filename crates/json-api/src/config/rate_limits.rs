//! Rate Limit Config

use clap::Args;
use replygate_app::rate_limits::RateLimitPolicy;

/// Request quotas.
#[derive(Debug, Args)]
pub struct RateLimitsConfig {
    /// Reply generations allowed per user and window
    #[arg(long, env = "GENERATE_MAX_REQUESTS", default_value_t = 30_u32)]
    pub generate_max_requests: u32,

    /// Reply generation window, in milliseconds
    #[arg(long, env = "GENERATE_WINDOW_MS", default_value_t = 60_000_u64)]
    pub generate_window_ms: u64,

    /// Token issuances allowed per client address and window
    #[arg(long, env = "ISSUE_MAX_REQUESTS", default_value_t = 10_u32)]
    pub issue_max_requests: u32,

    /// Token issuance window, in milliseconds
    #[arg(long, env = "ISSUE_WINDOW_MS", default_value_t = 60_000_u64)]
    pub issue_window_ms: u64,
}

impl RateLimitsConfig {
    #[must_use]
    pub fn generate_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.generate_max_requests, self.generate_window_ms)
    }

    #[must_use]
    pub fn issue_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.issue_max_requests, self.issue_window_ms)
    }
}
