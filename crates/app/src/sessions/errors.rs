//! Session service errors.

use thiserror::Error;

use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum SessionServiceError {
    #[error("no valid session")]
    Unauthenticated,

    #[error("session store unavailable")]
    StoreUnavailable(#[from] StoreError),
}
