//! Rate limit enforcement for handlers.

use replygate_app::rate_limits::{RateLimitDecision, RateLimitPolicy};
use salvo::{Request, Response};
use tracing::warn;

use crate::{errors::ApiError, observability::observe_rate_limit, state::State};

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Count one request against `key`, failing with `rate_limited` on denial.
///
/// Allowed requests get `X-RateLimit-*` headers describing the quota left.
pub(crate) async fn enforce(
    state: &State,
    key: &str,
    policy: RateLimitPolicy,
    res: &mut Response,
) -> Result<RateLimitDecision, ApiError> {
    let decision = state.app.rate_limits.check(key, policy).await;

    observe_rate_limit(&decision);

    if !decision.allowed {
        return Err(ApiError::rate_limited(decision.retry_after_secs()));
    }

    for (name, value) in [
        (LIMIT_HEADER, decision.limit),
        (REMAINING_HEADER, decision.remaining),
    ] {
        if let Err(source) = res.add_header(name, value.to_string(), true) {
            warn!("failed to set {name} header: {source}");
        }
    }

    Ok(decision)
}

/// Address the issuance quota is keyed on.
///
/// The first `X-Forwarded-For` hop wins when the gateway sits behind a proxy.
pub(crate) fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_owned();
    }

    let remote = req.remote_addr().to_string();

    remote
        .parse::<std::net::SocketAddr>()
        .map_or(remote, |addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use salvo::{
        Router, Service, handler,
        test::{ResponseExt, TestClient},
    };
    use testresult::TestResult;

    use super::*;

    #[handler]
    async fn echo_ip(req: &mut Request) -> String {
        client_ip(req)
    }

    #[tokio::test]
    async fn forwarded_for_takes_precedence() -> TestResult {
        let service = Service::new(Router::new().get(echo_ip));

        let ip = TestClient::get("http://example.com")
            .add_header("x-forwarded-for", "203.0.113.9, 10.0.0.1", true)
            .send(&service)
            .await
            .take_string()
            .await?;

        assert_eq!(ip, "203.0.113.9");

        Ok(())
    }
}
