//! Sessions service.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mockall::automock;
use sqlx::PgPool;
use tracing::debug;

use crate::{
    auth::hash_token,
    clock::Clock,
    database::bounded,
    sessions::{SessionServiceError, repository::PgSessionsRepository},
    users::UserUuid,
};

#[derive(Clone)]
pub struct PgSessionsService {
    repository: PgSessionsRepository,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl PgSessionsService {
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            repository: PgSessionsRepository::new(pool),
            clock,
            store_timeout,
        }
    }
}

#[async_trait]
impl SessionService for PgSessionsService {
    async fn authenticate_session(
        &self,
        session_token: &str,
    ) -> Result<UserUuid, SessionServiceError> {
        if session_token.trim().is_empty() {
            return Err(SessionServiceError::Unauthenticated);
        }

        let session = bounded(
            self.store_timeout,
            self.repository.find_by_token_hash(&hash_token(session_token)),
        )
        .await?
        .ok_or(SessionServiceError::Unauthenticated)?;

        if session.expires_at <= self.clock.now() {
            debug!(session = %session.uuid, "session expired");

            return Err(SessionServiceError::Unauthenticated);
        }

        Ok(session.user_uuid)
    }
}

/// Resolution of first-party web sessions.
#[automock]
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Resolve the user owning the raw session cookie value.
    async fn authenticate_session(
        &self,
        session_token: &str,
    ) -> Result<UserUuid, SessionServiceError>;
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};
    use testresult::TestResult;

    use crate::{
        clock::ManualClock,
        test::{TestContext, helpers::insert_session},
    };

    use super::*;

    fn service(ctx: &TestContext, clock: Arc<ManualClock>) -> PgSessionsService {
        PgSessionsService::new(ctx.db.pool().clone(), clock, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn live_session_resolves_user() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();
        let user = UserUuid::new();

        insert_session(&ctx, user, "cookie-value", now.checked_add(SignedDuration::from_hours(1))?)
            .await;

        let resolved = service(&ctx, Arc::new(ManualClock::new(now)))
            .authenticate_session("cookie-value")
            .await?;

        assert_eq!(resolved, user);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_session_is_unauthenticated() -> TestResult {
        let ctx = TestContext::new().await;

        let result = service(&ctx, Arc::new(ManualClock::new(Timestamp::now())))
            .authenticate_session("never-issued")
            .await;

        assert!(matches!(result, Err(SessionServiceError::Unauthenticated)));

        Ok(())
    }

    #[tokio::test]
    async fn expired_session_is_unauthenticated() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();

        insert_session(&ctx, UserUuid::new(), "stale", now).await;

        let result = service(&ctx, Arc::new(ManualClock::new(now)))
            .authenticate_session("stale")
            .await;

        assert!(matches!(result, Err(SessionServiceError::Unauthenticated)));

        Ok(())
    }

    #[tokio::test]
    async fn blank_session_never_hits_the_store() -> TestResult {
        let ctx = TestContext::new().await;

        let result = service(&ctx, Arc::new(ManualClock::new(Timestamp::now())))
            .authenticate_session("   ")
            .await;

        assert!(matches!(result, Err(SessionServiceError::Unauthenticated)));

        Ok(())
    }
}
