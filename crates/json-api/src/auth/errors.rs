//! Auth Errors

use replygate_app::auth::{AuthServiceError, TokenError};
use tracing::{error, warn};

use crate::{errors::ApiError, observability::observe_auth_failure};

/// Present a verification failure to the caller.
///
/// Expired and unknown credentials share one response so callers cannot tell
/// whether a token ever existed. Store trouble fails closed.
pub(crate) fn into_api_error(error: AuthServiceError) -> ApiError {
    observe_auth_failure(error.reason());

    match error {
        AuthServiceError::MalformedCredential(_) => ApiError::malformed_credential(),
        AuthServiceError::CredentialExpired | AuthServiceError::CredentialNotFound => {
            ApiError::invalid_credential()
        }
        AuthServiceError::StoreUnavailable(source) => {
            warn!("credential store unavailable during verification: {source}");

            ApiError::unauthenticated()
        }
        AuthServiceError::Expiry(source) => {
            error!("failed to compute credential expiry: {source}");

            ApiError::internal()
        }
    }
}
