//! Transit slot: where the page leaves a freshly minted credential for the
//! capturer to pick up.

mod loopback;
mod memory;

use std::fmt::Debug;

use async_trait::async_trait;
use mockall::automock;

use crate::{errors::BridgeError, payload::TransferPayload};

pub use loopback::{DEFAULT_TRANSIT_PORT, LoopbackSlot};
pub use memory::MemorySlot;

/// Single-value hand-off between the page context and the capturer.
///
/// `take` consumes: a payload is handed out at most once.
#[automock]
#[async_trait]
pub trait TransitSlot: Debug + Send + Sync {
    /// Replace whatever the slot holds with `payload`.
    async fn place(&self, payload: TransferPayload) -> Result<(), BridgeError>;

    /// Remove and return the payload, if one is waiting.
    async fn take(&self) -> Result<Option<TransferPayload>, BridgeError>;
}
