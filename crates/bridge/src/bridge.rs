//! Wiring every context of the bridge into one value.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

use crate::{
    api::{ApiClient, ApiClientConfig},
    capture::Capturer,
    channel::{PageChannel, RuntimeBus},
    errors::BridgeError,
    handshake::Handshake,
    issuer::SessionIssuer,
    machine::{HandshakeMachine, HandshakeState},
    observer::ConnectionObserver,
    page::PageContext,
    storage::ExtensionStorage,
    transit::TransitSlot,
    worker::BackgroundWorker,
};

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub resync_timeout: Duration,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl BridgeSettings {
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            http_timeout: Duration::from_secs(10),
            resync_timeout: Duration::from_secs(15),
            poll_interval: crate::capture::POLL_INTERVAL,
            max_attempts: crate::capture::MAX_ATTEMPTS,
        }
    }
}

/// Page, capturer, background worker, observer and API client sharing one
/// storage, one handshake machine and one runtime bus.
///
/// Background tasks stop when the bridge is dropped.
#[derive(Debug)]
pub struct Bridge {
    machine: Arc<HandshakeMachine>,
    storage: Arc<dyn ExtensionStorage>,
    handshake: Handshake,
    api: ApiClient,
    connected: watch::Receiver<Option<Uuid>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Bridge {
    /// Assemble the bridge, resuming as connected when the synced area says so.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Storage`] when the synced area cannot be read,
    /// or [`BridgeError::Http`] when the HTTP client cannot be built.
    pub async fn start(
        issuer: Arc<dyn SessionIssuer>,
        slot: Arc<dyn TransitSlot>,
        storage: Arc<dyn ExtensionStorage>,
        settings: BridgeSettings,
    ) -> Result<Self, BridgeError> {
        let resumed = storage
            .synced()
            .await?
            .filter(|status| status.connected)
            .map(|status| status.user_id);

        let machine = Arc::new(HandshakeMachine::at(if resumed.is_some() {
            HandshakeState::Connected
        } else {
            HandshakeState::Disconnected
        }));

        let runtime = RuntimeBus::new();
        let channel = PageChannel::new();

        let observer = ConnectionObserver::new(machine.clone(), resumed);
        let connected = observer.watch();
        let observer_task = tokio::spawn(observer.run(storage.subscribe(), runtime.subscribe()));

        let (worker, worker_task) = BackgroundWorker::new(
            issuer.clone(),
            storage.clone(),
            machine.clone(),
            runtime.clone(),
        )
        .spawn();

        let api = ApiClient::new(
            ApiClientConfig {
                base_url: settings.api_base_url,
                timeout: settings.http_timeout,
                resync_timeout: settings.resync_timeout,
            },
            storage.clone(),
            machine.clone(),
            runtime.clone(),
            worker.clone(),
        )?;

        let handshake = Handshake::new(
            PageContext::new(issuer, slot.clone(), channel.clone(), machine.clone()),
            Capturer::new(slot).with_polling(settings.poll_interval, settings.max_attempts),
            channel,
            storage.clone(),
            machine.clone(),
            runtime,
            worker,
            settings.resync_timeout,
        );

        Ok(Self {
            machine,
            storage,
            handshake,
            api,
            connected,
            tasks: vec![observer_task, worker_task],
        })
    }

    /// # Errors
    ///
    /// See [`Handshake::connect`].
    pub async fn connect(&self) -> Result<Uuid, BridgeError> {
        self.handshake.connect().await
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn storage(&self) -> &Arc<dyn ExtensionStorage> {
        &self.storage
    }

    pub fn state(&self) -> HandshakeState {
        self.machine.state()
    }

    pub fn states(&self) -> watch::Receiver<HandshakeState> {
        self.machine.subscribe()
    }

    /// Connected user as seen by the observer.
    pub fn connected(&self) -> watch::Receiver<Option<Uuid>> {
        self.connected.clone()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
