use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{errors::BridgeError, payload::TransferPayload, transit::TransitSlot};

/// Slot shared by a page and a capturer living in one process.
#[derive(Debug, Default)]
pub struct MemorySlot {
    payload: Mutex<Option<TransferPayload>>,
}

impl MemorySlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a payload is waiting. Does not consume it.
    pub fn is_occupied(&self) -> bool {
        self.payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[async_trait]
impl TransitSlot for MemorySlot {
    async fn place(&self, payload: TransferPayload) -> Result<(), BridgeError> {
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload);

        Ok(())
    }

    async fn take(&self) -> Result<Option<TransferPayload>, BridgeError> {
        Ok(self
            .payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take())
    }
}
