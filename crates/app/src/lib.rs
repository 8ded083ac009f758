//! Replygate domain and persistence modules.

pub mod auth;
pub mod clock;
pub mod context;
pub mod database;
pub mod rate_limits;
pub mod replies;
pub mod sessions;
pub mod users;

#[cfg(test)]
mod test;

mod uuids;
