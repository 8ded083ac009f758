//! Bearer authentication

mod errors;
pub(crate) mod middleware;

pub(crate) use errors::into_api_error;
