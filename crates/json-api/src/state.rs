//! State

use std::sync::Arc;

use replygate_app::{context::AppContext, rate_limits::RateLimitPolicy};

/// Gateway settings handlers need per request.
#[derive(Debug, Clone)]
pub(crate) struct GatewaySettings {
    pub(crate) session_cookie_name: String,
    pub(crate) issue_policy: RateLimitPolicy,
    pub(crate) generate_policy: RateLimitPolicy,
}

#[derive(Clone)]
pub(crate) struct State {
    pub(crate) app: AppContext,
    pub(crate) settings: GatewaySettings,
}

impl State {
    #[must_use]
    pub(crate) fn new(app: AppContext, settings: GatewaySettings) -> Self {
        Self { app, settings }
    }

    #[must_use]
    pub(crate) fn shared(app: AppContext, settings: GatewaySettings) -> Arc<Self> {
        Arc::new(Self::new(app, settings))
    }
}
