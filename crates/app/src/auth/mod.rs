//! Extension credentials: issuance and bearer verification.

mod errors;
mod records;
mod repository;
mod service;
mod token;

pub use errors::*;
pub use records::*;
pub use repository::{CredentialRepository, MockCredentialRepository, PgCredentialRepository};
pub use service::*;
pub use token::*;
