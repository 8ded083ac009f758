//! Page context: the authenticated web page that starts a handshake.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    channel::PageChannel,
    errors::BridgeError,
    issuer::SessionIssuer,
    machine::{HandshakeMachine, HandshakeState, ResetCause},
    transit::TransitSlot,
};

/// The page never keeps the token: it goes into the slot and onto the
/// broadcast, and the page forgets it.
pub struct PageContext {
    issuer: Arc<dyn SessionIssuer>,
    slot: Arc<dyn TransitSlot>,
    channel: PageChannel,
    machine: Arc<HandshakeMachine>,
}

impl std::fmt::Debug for PageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("slot", &self.slot)
            .field("machine", &self.machine)
            .finish_non_exhaustive()
    }
}

impl PageContext {
    #[must_use]
    pub fn new(
        issuer: Arc<dyn SessionIssuer>,
        slot: Arc<dyn TransitSlot>,
        channel: PageChannel,
        machine: Arc<HandshakeMachine>,
    ) -> Self {
        Self {
            issuer,
            slot,
            channel,
            machine,
        }
    }

    pub fn channel(&self) -> &PageChannel {
        &self.channel
    }

    /// Explicit user action: mint a token and put it in transit.
    ///
    /// # Errors
    ///
    /// Returns the issuer's error (the machine is reset), a slot error, or
    /// [`BridgeError::InvalidTransition`] when a handshake is already running.
    pub async fn connect(&self) -> Result<Uuid, BridgeError> {
        self.machine.advance(HandshakeState::TokenRequested)?;

        let payload = match self.issuer.issue().await {
            Ok(payload) => payload,
            Err(error) => {
                self.machine.reset(ResetCause::IssuanceFailed);

                return Err(error);
            }
        };

        let user_id = payload.user_id;

        self.slot.place(payload.clone()).await?;
        self.machine.advance(HandshakeState::TokenPlacedInTransit)?;
        self.channel.publish(payload);

        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{issuer::MockSessionIssuer, payload::TransferPayload, transit::MemorySlot};

    use super::*;

    #[tokio::test]
    async fn connect_places_and_broadcasts() -> TestResult {
        let user_id = Uuid::now_v7();
        let mut issuer = MockSessionIssuer::new();

        issuer.expect_issue().once().return_once(move || {
            Ok(TransferPayload {
                token: "t".repeat(64),
                user_id,
            })
        });

        let slot = Arc::new(MemorySlot::new());
        let machine = Arc::new(HandshakeMachine::new());
        let page = PageContext::new(
            Arc::new(issuer),
            slot.clone(),
            PageChannel::new(),
            machine.clone(),
        );
        let mut broadcast = page.channel().subscribe();

        assert_eq!(page.connect().await?, user_id);
        assert!(slot.is_occupied(), "slot should hold the payload");
        assert_eq!(broadcast.recv().await?.user_id, user_id);
        assert_eq!(machine.state(), HandshakeState::TokenPlacedInTransit);

        Ok(())
    }

    #[tokio::test]
    async fn signed_out_page_stays_disconnected() {
        let mut issuer = MockSessionIssuer::new();

        issuer
            .expect_issue()
            .once()
            .return_once(|| Err(BridgeError::Unauthenticated));

        let machine = Arc::new(HandshakeMachine::new());
        let page = PageContext::new(
            Arc::new(issuer),
            Arc::new(MemorySlot::new()),
            PageChannel::new(),
            machine.clone(),
        );

        assert!(matches!(
            page.connect().await,
            Err(BridgeError::Unauthenticated)
        ));
        assert_eq!(machine.state(), HandshakeState::Disconnected);
    }
}
