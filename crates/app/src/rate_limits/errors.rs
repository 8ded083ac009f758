//! Rate limit errors.

use thiserror::Error;

use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Quota exhausted; recoverable after `reset_ms`.
    #[error("rate limited, retry in {reset_ms}ms")]
    RateLimited { reset_ms: u64 },

    #[error("rate limit store unavailable")]
    StoreUnavailable(#[from] StoreError),
}
