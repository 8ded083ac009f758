//! Replygate handshake bridge.
//!
//! Carries a freshly minted extension credential from the signed-in web page
//! into extension storage, with a background worker that re-issues over the
//! network when the hand-off does not arrive.

pub mod api;
pub mod bridge;
pub mod capture;
pub mod channel;
pub mod errors;
pub mod handshake;
pub mod issuer;
pub mod machine;
pub mod observer;
pub mod page;
pub mod payload;
pub mod storage;
pub mod transit;
pub mod worker;

pub use bridge::{Bridge, BridgeSettings};
pub use errors::{BridgeError, StorageError};
pub use payload::TransferPayload;
