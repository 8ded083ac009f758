//! In-process message channels between bridge contexts.

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::payload::TransferPayload;

const CAPACITY: usize = 16;

/// Same-page broadcast the page uses alongside the transit slot.
#[derive(Debug, Clone)]
pub struct PageChannel {
    sender: broadcast::Sender<TransferPayload>,
}

impl Default for PageChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl PageChannel {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(CAPACITY);

        Self { sender }
    }

    pub fn publish(&self, payload: TransferPayload) {
        if self.sender.send(payload).is_err() {
            debug!("no page listener for credential broadcast");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransferPayload> {
        self.sender.subscribe()
    }
}

/// Extension-wide runtime notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    Connected { user_id: Uuid },
    Disconnected,
}

/// Runtime message bus every extension context listens on.
#[derive(Debug, Clone)]
pub struct RuntimeBus {
    sender: broadcast::Sender<RuntimeEvent>,
}

impl Default for RuntimeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(CAPACITY);

        Self { sender }
    }

    pub fn publish(&self, event: RuntimeEvent) {
        if self.sender.send(event).is_err() {
            debug!(?event, "no runtime listener");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.sender.subscribe()
    }
}
