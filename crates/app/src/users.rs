//! Users
//!
//! Users are owned by the web application; this crate only ever refers to them
//! by identifier.

use crate::uuids::TypedUuid;

/// Marker for user identifiers.
#[derive(Debug)]
pub struct User;

/// Stable identifier of an authenticated principal.
pub type UserUuid = TypedUuid<User>;
