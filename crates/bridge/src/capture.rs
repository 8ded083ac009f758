//! Capturer: picks the credential up from the transit slot or the page
//! broadcast, whichever delivers first.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, warn};

use crate::{errors::BridgeError, payload::TransferPayload, transit::TransitSlot};

pub const POLL_INTERVAL: Duration = Duration::from_millis(200);
pub const MAX_ATTEMPTS: u32 = 50;

#[derive(Debug, Clone)]
pub struct Capturer {
    slot: Arc<dyn TransitSlot>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl Capturer {
    #[must_use]
    pub fn new(slot: Arc<dyn TransitSlot>) -> Self {
        Self {
            slot,
            poll_interval: POLL_INTERVAL,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_polling(mut self, poll_interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_attempts = max_attempts;
        self
    }

    /// Wait for a credential. `None` once every poll attempt came up empty.
    ///
    /// # Errors
    ///
    /// Returns the slot's error when reading it fails outright.
    pub async fn capture(
        &self,
        mut broadcast: broadcast::Receiver<TransferPayload>,
    ) -> Result<Option<TransferPayload>, BridgeError> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts = 0;
        let mut listening = true;

        while attempts < self.max_attempts {
            tokio::select! {
                _ = ticker.tick() => {
                    attempts += 1;

                    if let Some(payload) = self.slot.take().await? {
                        debug!(attempts, "credential captured from transit slot");

                        return Ok(Some(payload));
                    }
                }
                received = broadcast.recv(), if listening => match received {
                    Ok(payload) => {
                        debug!("credential captured from page broadcast");
                        self.drain().await;

                        return Ok(Some(payload));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "page broadcast lagged");
                    }
                    Err(RecvError::Closed) => listening = false,
                },
            }
        }

        debug!(attempts, "transit slot stayed empty");

        Ok(None)
    }

    /// The broadcast won; make sure the slot does not keep a copy.
    async fn drain(&self) {
        match self.slot.take().await {
            Ok(Some(_copy)) => debug!("drained transit slot"),
            Ok(None) => {}
            Err(source) => warn!("failed to drain transit slot: {source}"),
        }
    }
}
