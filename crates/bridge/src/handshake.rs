//! The full connect flow: page, capture, persist, with the background
//! worker as fallback.

use std::{sync::Arc, time::Duration};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    capture::Capturer,
    channel::{PageChannel, RuntimeBus, RuntimeEvent},
    errors::BridgeError,
    machine::{HandshakeMachine, HandshakeState},
    page::PageContext,
    storage::{ExtensionStorage, persist_credential},
    worker::WorkerHandle,
};

#[derive(Debug)]
pub struct Handshake {
    page: PageContext,
    capturer: Capturer,
    listen: PageChannel,
    storage: Arc<dyn ExtensionStorage>,
    machine: Arc<HandshakeMachine>,
    runtime: RuntimeBus,
    worker: WorkerHandle,
    worker_timeout: Duration,
}

impl Handshake {
    /// `listen` is the broadcast the capturer hears; in one process that is
    /// the page's own channel.
    #[must_use]
    #[expect(clippy::too_many_arguments, reason = "wires every bridge context")]
    pub fn new(
        page: PageContext,
        capturer: Capturer,
        listen: PageChannel,
        storage: Arc<dyn ExtensionStorage>,
        machine: Arc<HandshakeMachine>,
        runtime: RuntimeBus,
        worker: WorkerHandle,
        worker_timeout: Duration,
    ) -> Self {
        Self {
            page,
            capturer,
            listen,
            storage,
            machine,
            runtime,
            worker,
            worker_timeout,
        }
    }

    /// Run a handshake to the point where the credential is stored and synced.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. A capture window that passes
    /// without a credential is not an error: the background worker takes over.
    pub async fn connect(&self) -> Result<Uuid, BridgeError> {
        let broadcast = self.listen.subscribe();

        self.page.connect().await?;

        let Some(payload) = self.capturer.capture(broadcast).await? else {
            warn!("capture window elapsed, falling back to background issuance");

            return self.worker.resync(self.worker_timeout).await;
        };

        let user_id = payload.user_id;

        self.machine.advance(HandshakeState::Captured)?;
        persist_credential(self.storage.as_ref(), &self.machine, payload).await?;
        self.runtime.publish(RuntimeEvent::Connected { user_id });

        info!(%user_id, "extension connected");

        Ok(user_id)
    }
}
