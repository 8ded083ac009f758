//! Extension Errors

use replygate_app::sessions::SessionServiceError;
use tracing::error;

use crate::errors::ApiError;

pub(crate) fn session_error(error: SessionServiceError) -> ApiError {
    match error {
        SessionServiceError::Unauthenticated => ApiError::unauthenticated(),
        SessionServiceError::StoreUnavailable(source) => {
            error!("failed to resolve web session: {source}");

            ApiError::internal()
        }
    }
}
