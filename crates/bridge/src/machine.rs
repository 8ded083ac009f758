//! Handshake state machine.

use std::fmt;

use tokio::sync::watch;
use tracing::{info, warn};

/// Where a credential is on its way from the web session into storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    Disconnected,
    TokenRequested,
    TokenPlacedInTransit,
    Captured,
    PersistedLocally,
    Synced,
    Connected,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::TokenRequested => "token_requested",
            Self::TokenPlacedInTransit => "token_placed_in_transit",
            Self::Captured => "captured",
            Self::PersistedLocally => "persisted_locally",
            Self::Synced => "synced",
            Self::Connected => "connected",
        };

        f.write_str(name)
    }
}

/// Why a handshake went back to [`HandshakeState::Disconnected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCause {
    Expired,
    Revoked,
    IssuanceFailed,
}

impl HandshakeState {
    /// Forward edges. Resets to `Disconnected` are handled separately.
    fn can_advance_to(self, next: Self) -> bool {
        use HandshakeState::{
            Captured, Connected, Disconnected, PersistedLocally, Synced, TokenPlacedInTransit,
            TokenRequested,
        };

        matches!(
            (self, next),
            (Disconnected | Connected, TokenRequested)
                | (TokenRequested, TokenPlacedInTransit)
                // Background fallback issues over the network, skipping transit.
                | (TokenRequested | TokenPlacedInTransit, Captured)
                | (TokenPlacedInTransit, TokenRequested)
                | (Captured, PersistedLocally)
                | (PersistedLocally, Synced)
                | (Synced, Connected)
        )
    }
}

/// Enforces the handshake transition table and publishes the current state.
///
/// The cause of the last reset is kept until the handshake leaves
/// `Disconnected` again.
#[derive(Debug)]
pub struct HandshakeMachine {
    state: watch::Sender<HandshakeState>,
    cause: watch::Sender<Option<ResetCause>>,
}

impl Default for HandshakeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl HandshakeMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::at(HandshakeState::Disconnected)
    }

    #[must_use]
    pub fn at(state: HandshakeState) -> Self {
        let (state, _receiver) = watch::channel(state);
        let (cause, _receiver) = watch::channel(None);

        Self { state, cause }
    }

    pub fn state(&self) -> HandshakeState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<HandshakeState> {
        self.state.subscribe()
    }

    /// Why the handshake is `Disconnected`, if it was reset rather than never started.
    pub fn reset_cause(&self) -> Option<ResetCause> {
        if self.state() == HandshakeState::Disconnected {
            *self.cause.borrow()
        } else {
            None
        }
    }

    /// Move along a forward edge.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BridgeError::InvalidTransition`] for edges outside the
    /// table; the state is left untouched.
    pub fn advance(&self, next: HandshakeState) -> Result<(), crate::BridgeError> {
        let mut outcome = Ok(());

        self.state.send_if_modified(|current| {
            let from = *current;

            if !from.can_advance_to(next) {
                warn!(%from, to = %next, "rejected handshake transition");
                outcome = Err(crate::BridgeError::InvalidTransition { from, to: next });

                return false;
            }

            info!(%from, to = %next, "handshake transition");
            *current = next;

            true
        });

        if outcome.is_ok() {
            self.cause.send_if_modified(|cause| cause.take().is_some());
        }

        outcome
    }

    /// Drop back to `Disconnected` from any state.
    pub fn reset(&self, cause: ResetCause) {
        self.cause.send_replace(Some(cause));
        self.state.send_if_modified(|current| {
            if *current == HandshakeState::Disconnected {
                return false;
            }

            info!(from = %current, ?cause, "handshake reset");
            *current = HandshakeState::Disconnected;

            true
        });
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::BridgeError;

    use super::*;

    #[test]
    fn happy_path_walks_every_state() -> TestResult {
        let machine = HandshakeMachine::new();

        for next in [
            HandshakeState::TokenRequested,
            HandshakeState::TokenPlacedInTransit,
            HandshakeState::Captured,
            HandshakeState::PersistedLocally,
            HandshakeState::Synced,
            HandshakeState::Connected,
        ] {
            machine.advance(next)?;
        }

        assert_eq!(machine.state(), HandshakeState::Connected);

        Ok(())
    }

    #[test]
    fn skipping_states_is_rejected() {
        let machine = HandshakeMachine::new();

        assert!(matches!(
            machine.advance(HandshakeState::Synced),
            Err(BridgeError::InvalidTransition {
                from: HandshakeState::Disconnected,
                to: HandshakeState::Synced,
            })
        ));
        assert_eq!(machine.state(), HandshakeState::Disconnected);
    }

    #[test]
    fn fallback_may_capture_without_transit() -> TestResult {
        let machine = HandshakeMachine::at(HandshakeState::TokenPlacedInTransit);

        machine.advance(HandshakeState::TokenRequested)?;
        machine.advance(HandshakeState::Captured)?;

        Ok(())
    }

    #[test]
    fn expiry_resets_from_any_state() {
        for state in [
            HandshakeState::Captured,
            HandshakeState::Synced,
            HandshakeState::Connected,
        ] {
            let machine = HandshakeMachine::at(state);

            machine.reset(ResetCause::Expired);

            assert_eq!(machine.state(), HandshakeState::Disconnected, "from {state}");
        }
    }

    #[test]
    fn reset_cause_lasts_until_the_next_handshake() -> TestResult {
        let machine = HandshakeMachine::at(HandshakeState::Connected);

        assert_eq!(machine.reset_cause(), None);

        machine.reset(ResetCause::Expired);
        machine.reset(ResetCause::Revoked);

        assert_eq!(machine.reset_cause(), Some(ResetCause::Revoked));

        machine.advance(HandshakeState::TokenRequested)?;

        assert_eq!(machine.reset_cause(), None);

        Ok(())
    }

    #[tokio::test]
    async fn watchers_see_transitions() -> TestResult {
        let machine = HandshakeMachine::new();
        let mut watcher = machine.subscribe();

        machine.advance(HandshakeState::TokenRequested)?;
        watcher.changed().await?;

        assert_eq!(*watcher.borrow(), HandshakeState::TokenRequested);

        Ok(())
    }
}
