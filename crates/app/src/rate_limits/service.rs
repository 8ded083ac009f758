//! Rate limit service.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mockall::automock;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::{
    clock::Clock,
    database::bounded,
    rate_limits::{
        InsertOutcome, PgRateLimitRepository, RateLimitDecision, RateLimitError,
        RateLimitPolicy, RateLimitRepository,
    },
};

/// Rounds of increment-or-insert before giving up on a contended window.
const MAX_WINDOW_ATTEMPTS: usize = 2;

#[derive(Clone)]
pub struct WindowRateLimitService {
    repository: Arc<dyn RateLimitRepository>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl WindowRateLimitService {
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self::from_repository(
            Arc::new(PgRateLimitRepository::new(pool)),
            clock,
            store_timeout,
        )
    }

    #[must_use]
    pub fn from_repository(
        repository: Arc<dyn RateLimitRepository>,
        clock: Arc<dyn Clock>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            clock,
            store_timeout,
        }
    }

    async fn decide(
        &self,
        key: &str,
        policy: RateLimitPolicy,
        now_ms: i64,
    ) -> Result<RateLimitDecision, sqlx::Error> {
        let window_start = policy.window_start(now_ms);
        let reset_ms = policy.reset_ms(window_start, now_ms);
        let max_requests = i32::try_from(policy.max_requests).unwrap_or(i32::MAX);

        for _ in 0..MAX_WINDOW_ATTEMPTS {
            if let Some(count) = self
                .repository
                .increment_below(key, window_start, max_requests)
                .await?
            {
                let count = u32::try_from(count).unwrap_or(policy.max_requests);

                return Ok(RateLimitDecision::allow(policy, count, reset_ms));
            }

            if self.repository.find_count(key, window_start).await?.is_some() {
                return Ok(RateLimitDecision::deny(policy, reset_ms));
            }

            match self.repository.insert_first(key, window_start).await? {
                InsertOutcome::Inserted => {
                    return Ok(RateLimitDecision::allow(policy, 1, reset_ms));
                }
                InsertOutcome::Conflict => {
                    debug!(key, window_start, "lost window creation race; re-reading");
                }
            }
        }

        // Row vanished between steps, e.g. pruned mid-check.
        Ok(RateLimitDecision::deny(policy, reset_ms))
    }
}

#[async_trait]
impl RateLimitService for WindowRateLimitService {
    async fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        let now_ms = self.clock.now_ms();

        if policy.max_requests == 0 {
            let window_start = policy.window_start(now_ms);

            return RateLimitDecision::deny(policy, policy.reset_ms(window_start, now_ms));
        }

        match bounded(self.store_timeout, self.decide(key, policy, now_ms)).await {
            Ok(decision) => decision,
            Err(source) => {
                warn!(
                    key,
                    degraded = true,
                    "rate limiter store unavailable, failing open: {source}"
                );

                RateLimitDecision::fail_open(policy)
            }
        }
    }

    async fn prune(&self, older_than_ms: u64) -> Result<u64, RateLimitError> {
        let cutoff = self
            .clock
            .now_ms()
            .saturating_sub(i64::try_from(older_than_ms).unwrap_or(i64::MAX));

        let pruned = bounded(self.store_timeout, self.repository.prune_before(cutoff)).await?;

        debug!(pruned, cutoff, "pruned stale rate limit windows");

        Ok(pruned)
    }
}

/// Persisted fixed-window rate limiting.
#[automock]
#[async_trait]
pub trait RateLimitService: Send + Sync {
    /// Count one request against `key` and decide whether it may proceed.
    ///
    /// Never fails: store outages produce a degraded, allowing decision.
    async fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision;

    /// Delete windows that started more than `older_than_ms` ago.
    async fn prune(&self, older_than_ms: u64) -> Result<u64, RateLimitError>;
}
