//! App Context

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    auth::{AuthService, AuthSettings, TokenAuthService},
    clock::{Clock, SystemClock},
    database,
    rate_limits::{RateLimitService, WindowRateLimitService},
    replies::{GenerationError, HttpReplyGenerator, ReplyGenerator, ReplyGeneratorConfig},
    sessions::{PgSessionsService, SessionService},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to build completion client")]
    Replies(#[source] GenerationError),
}

/// Everything [`AppContext::from_database_url`] needs besides the URL.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub auth: AuthSettings,

    /// Upper bound for session and rate limit store calls.
    pub store_timeout: Duration,

    pub replies: ReplyGeneratorConfig,
}

#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<dyn AuthService>,
    pub sessions: Arc<dyn SessionService>,
    pub rate_limits: Arc<dyn RateLimitService>,
    pub replies: Arc<dyn ReplyGenerator>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails or the
    /// completion client cannot be built.
    pub async fn from_database_url(url: &str, settings: AppSettings) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let replies =
            HttpReplyGenerator::new(settings.replies).map_err(AppInitError::Replies)?;

        Ok(Self {
            auth: Arc::new(TokenAuthService::new(
                pool.clone(),
                clock.clone(),
                settings.auth,
            )),
            sessions: Arc::new(PgSessionsService::new(
                pool.clone(),
                clock.clone(),
                settings.store_timeout,
            )),
            rate_limits: Arc::new(WindowRateLimitService::new(
                pool,
                clock,
                settings.store_timeout,
            )),
            replies: Arc::new(replies),
        })
    }
}
