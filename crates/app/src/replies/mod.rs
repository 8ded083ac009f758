//! Downstream reply generation.
//!
//! The gateway forwards an authenticated, rate-limited request to a
//! completion service and relays the generated reply. Prompt construction
//! lives upstream; this module only carries the request across.

mod client;
mod data;
mod errors;

pub use client::*;
pub use data::*;
pub use errors::GenerationError;
