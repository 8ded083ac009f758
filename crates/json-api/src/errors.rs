//! JSON error responses.
//!
//! Every failure leaves the gateway as `{ "error": <code>, "message": <text> }`
//! with a stable machine-readable code. Rate limit denials additionally carry
//! `retryAfter` and a `Retry-After` header.

use salvo::{
    http::{StatusCode, header::RETRY_AFTER},
    oapi::{self, EndpointOutRegister, ToSchema},
    prelude::{Json, Response, StatusError},
    writing::Scribe,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ErrorCode {
    Unauthenticated,
    MalformedCredential,
    InvalidCredential,
    RateLimited,
    BadRequest,
    UpstreamError,
    InternalError,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::MalformedCredential | Self::InvalidCredential => {
                StatusCode::UNAUTHORIZED
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    pub error: ErrorCode,
    pub message: String,

    /// Seconds until the quota resets, on `rate_limited` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApiError {
    body: ErrorBody,
}

impl ApiError {
    pub(crate) fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            body: ErrorBody {
                error: code,
                message: message.into(),
                retry_after: None,
            },
        }
    }

    pub(crate) fn unauthenticated() -> Self {
        Self::new(ErrorCode::Unauthenticated, "Authentication required")
    }

    pub(crate) fn malformed_credential() -> Self {
        Self::new(
            ErrorCode::MalformedCredential,
            "Authorization header must carry a bearer token",
        )
    }

    pub(crate) fn invalid_credential() -> Self {
        Self::new(ErrorCode::InvalidCredential, "Credential is not valid")
    }

    pub(crate) fn rate_limited(retry_after_secs: u64) -> Self {
        let mut error = Self::new(ErrorCode::RateLimited, "Too many requests");

        error.body.retry_after = Some(retry_after_secs);

        error
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub(crate) fn upstream() -> Self {
        Self::new(ErrorCode::UpstreamError, "Reply generation failed")
    }

    pub(crate) fn internal() -> Self {
        Self::new(ErrorCode::InternalError, "Internal server error")
    }

    pub(crate) fn code(&self) -> ErrorCode {
        self.body.error
    }
}

impl From<StatusError> for ApiError {
    fn from(error: StatusError) -> Self {
        match error.code {
            StatusCode::UNAUTHORIZED => Self::unauthenticated(),
            StatusCode::BAD_REQUEST => Self::bad_request(error.brief),
            _ => Self::internal(),
        }
    }
}

impl Scribe for ApiError {
    fn render(self, res: &mut Response) {
        res.status_code(self.body.error.status());

        if let Some(seconds) = self.body.retry_after
            && let Err(source) = res.add_header(RETRY_AFTER, seconds.to_string(), true)
        {
            warn!("failed to set retry-after header: {source}");
        }

        res.render(Json(self.body));
    }
}

impl EndpointOutRegister for ApiError {
    fn register(components: &mut oapi::Components, operation: &mut oapi::Operation) {
        <StatusError as EndpointOutRegister>::register(components, operation);
    }
}
