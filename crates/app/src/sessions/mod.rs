//! First-party web sessions.
//!
//! The web application owns the `sessions` table; this module only resolves a
//! presented session cookie to the user it belongs to.

mod errors;
mod repository;
mod service;

pub use errors::SessionServiceError;
pub use service::*;
