//! Reply generation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },
}
