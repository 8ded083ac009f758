//! Fixed-window rate limiting backed by the shared store.

mod errors;
mod policy;
mod repository;
mod service;

pub use errors::RateLimitError;
pub use policy::*;
pub use repository::{
    InsertOutcome, MockRateLimitRepository, PgRateLimitRepository, RateLimitRepository,
};
pub use service::*;
