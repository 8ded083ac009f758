//! Issue Extension Token Handler

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extension::errors::session_error,
    extensions::*,
    quota::{client_ip, enforce},
    state::State,
};

/// Freshly minted credential. The token is shown exactly once.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IssuedTokenResponse {
    pub token: String,
    pub user_id: Uuid,
}

impl std::fmt::Debug for IssuedTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedTokenResponse")
            .field("token", &"**redacted**")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Issue Extension Token Handler
///
/// Trades the first-party session cookie for an extension bearer token,
/// replacing any token the user already held.
#[endpoint(
    tags("extension"),
    summary = "Issue extension token",
    responses(
        (status_code = StatusCode::OK, description = "Token issued"),
        (status_code = StatusCode::UNAUTHORIZED, description = "No valid web session"),
        (status_code = StatusCode::TOO_MANY_REQUESTS, description = "Rate limited"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<IssuedTokenResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    enforce(
        state,
        &format!("issue:{}", client_ip(req)),
        state.settings.issue_policy,
        res,
    )
    .await?;

    let session = req
        .cookie(&state.settings.session_cookie_name)
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(ApiError::unauthenticated)?;

    let user = state
        .app
        .sessions
        .authenticate_session(&session)
        .await
        .map_err(session_error)?;

    let issued = state
        .app
        .auth
        .issue_token(user)
        .await
        .or_500("failed to issue extension token")?;

    Ok(Json(IssuedTokenResponse {
        token: issued.token,
        user_id: issued.user_uuid.into_uuid(),
    }))
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use replygate_app::{
        auth::{IssuedToken, MockAuthService},
        rate_limits::{MockRateLimitService, RateLimitDecision},
        sessions::{MockSessionService, SessionServiceError},
        users::UserUuid,
    };
    use salvo::{
        http::header::COOKIE,
        test::{ResponseExt, TestClient},
    };
    use testresult::TestResult;

    use crate::test_helpers::{Mocks, allow_all, service_with, test_settings};

    use super::*;

    fn make_service(mocks: Mocks) -> Service {
        service_with(mocks, Router::with_path("extension/token").post(handler))
    }

    #[tokio::test]
    async fn session_cookie_is_traded_for_a_token() -> TestResult {
        let user = UserUuid::new();
        let mut sessions = MockSessionService::new();
        let mut auth = MockAuthService::new();

        sessions
            .expect_authenticate_session()
            .once()
            .withf(|cookie| cookie == "web-session")
            .return_once(move |_| Ok(user));
        auth.expect_issue_token()
            .once()
            .withf(move |requested| *requested == user)
            .return_once(move |_| {
                Ok(IssuedToken {
                    token: "t".repeat(64),
                    user_uuid: user,
                    expires_at: Timestamp::UNIX_EPOCH,
                })
            });

        let mut res = TestClient::post("http://example.com/extension/token")
            .add_header(COOKIE, "session=web-session", true)
            .add_header("x-forwarded-for", "198.51.100.7", true)
            .send(&make_service(Mocks {
                auth,
                sessions,
                rate_limits: allow_all("issue:198.51.100.7"),
                ..Mocks::default()
            }))
            .await;

        let body: serde_json::Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body["token"], "t".repeat(64));
        assert_eq!(body["userId"], user.to_string());

        Ok(())
    }

    #[tokio::test]
    async fn missing_cookie_is_unauthenticated() -> TestResult {
        let mut sessions = MockSessionService::new();

        sessions.expect_authenticate_session().never();

        let mut res = TestClient::post("http://example.com/extension/token")
            .send(&make_service(Mocks {
                sessions,
                rate_limits: allow_all("issue:"),
                ..Mocks::default()
            }))
            .await;

        let body: serde_json::Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
        assert_eq!(body["error"], "unauthenticated");

        Ok(())
    }

    #[tokio::test]
    async fn expired_session_is_unauthenticated() -> TestResult {
        let mut sessions = MockSessionService::new();

        sessions
            .expect_authenticate_session()
            .once()
            .return_once(|_| Err(SessionServiceError::Unauthenticated));

        let res = TestClient::post("http://example.com/extension/token")
            .add_header(COOKIE, "session=stale", true)
            .send(&make_service(Mocks {
                sessions,
                rate_limits: allow_all("issue:"),
                ..Mocks::default()
            }))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }

    #[tokio::test]
    async fn issuance_is_rate_limited_per_address() -> TestResult {
        let mut rate_limits = MockRateLimitService::new();
        let policy = test_settings().issue_policy;

        rate_limits
            .expect_check()
            .once()
            .withf(|key, _| key == "issue:203.0.113.50")
            .return_once(move |_, _| RateLimitDecision::deny(policy, 1_500));

        let mut res = TestClient::post("http://example.com/extension/token")
            .add_header(COOKIE, "session=web-session", true)
            .add_header("x-forwarded-for", "203.0.113.50", true)
            .send(&make_service(Mocks {
                rate_limits,
                ..Mocks::default()
            }))
            .await;

        let body: serde_json::Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(body["retryAfter"], 2);

        Ok(())
    }
}
