//! Revoke Extension Token Handler

use std::sync::Arc;

use salvo::prelude::*;
use tracing::info;

use crate::{errors::ApiError, extensions::*, state::State};

/// Revoke Extension Token Handler
///
/// Deletes every credential held by the caller. The presented token stops
/// working immediately.
#[endpoint(
    tags("extension"),
    summary = "Revoke extension tokens",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Tokens revoked"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<StatusCode, ApiError> {
    let user = depot.user_uuid_or_401()?;
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let revoked = state
        .app
        .auth
        .revoke_user_tokens(user)
        .await
        .or_500("failed to revoke extension tokens")?;

    info!(user = %user, revoked, "extension tokens revoked");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use replygate_app::{
        auth::{AuthServiceError, MockAuthService},
        database::StoreError,
        users::UserUuid,
    };
    use salvo::{http::header::AUTHORIZATION, test::TestClient};
    use testresult::TestResult;

    use crate::{
        auth::middleware,
        test_helpers::{VALID_TOKEN, service_with_auth},
    };

    use super::*;

    fn make_service(auth: MockAuthService) -> Service {
        service_with_auth(
            auth,
            Router::with_path("extension/token")
                .hoop(middleware::handler)
                .delete(handler),
        )
    }

    #[tokio::test]
    async fn revokes_callers_tokens() -> TestResult {
        let user = UserUuid::new();
        let mut auth = MockAuthService::new();

        auth.expect_authenticate_bearer()
            .once()
            .return_once(move |_| Ok(user));
        auth.expect_revoke_user_tokens()
            .once()
            .withf(move |revoked| *revoked == user)
            .return_once(|_| Ok(1));

        let res = TestClient::delete("http://example.com/extension/token")
            .add_header(AUTHORIZATION, format!("Bearer {VALID_TOKEN}"), true)
            .send(&make_service(auth))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));

        Ok(())
    }

    #[tokio::test]
    async fn store_failure_is_internal_error() -> TestResult {
        let mut auth = MockAuthService::new();

        auth.expect_authenticate_bearer()
            .once()
            .return_once(|_| Ok(UserUuid::new()));
        auth.expect_revoke_user_tokens().once().return_once(|_| {
            Err(AuthServiceError::StoreUnavailable(StoreError::Timeout(
                Duration::from_secs(2),
            )))
        });

        let res = TestClient::delete("http://example.com/extension/token")
            .add_header(AUTHORIZATION, format!("Bearer {VALID_TOKEN}"), true)
            .send(&make_service(auth))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));

        Ok(())
    }
}
