//! Auth service errors.

use thiserror::Error;

use crate::{auth::TokenError, database::StoreError};

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("malformed credential")]
    MalformedCredential(#[from] TokenError),

    #[error("credential expired")]
    CredentialExpired,

    #[error("credential not found")]
    CredentialNotFound,

    #[error("credential store unavailable")]
    StoreUnavailable(#[source] StoreError),

    #[error("could not compute credential expiry")]
    Expiry(#[source] jiff::Error),
}

impl AuthServiceError {
    /// Stable label for logs and metrics. Callers never see the
    /// expired/not-found distinction; see the gateway error mapping.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MalformedCredential(_) => "malformed_credential",
            Self::CredentialExpired => "credential_expired",
            Self::CredentialNotFound => "credential_not_found",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Expiry(_) => "expiry",
        }
    }
}

impl From<StoreError> for AuthServiceError {
    fn from(error: StoreError) -> Self {
        Self::StoreUnavailable(error)
    }
}
