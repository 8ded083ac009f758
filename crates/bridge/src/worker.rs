//! Background worker.
//!
//! The one context that can reach the network with the ambient web session.
//! Every inbound message is served by its own task and answered on a oneshot
//! channel once the work is done. Re-syncs run one at a time; requests that
//! queued behind a successful re-sync share its credential instead of minting
//! another one, since every issuance revokes the previous token.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::{Mutex, mpsc, oneshot},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    channel::{RuntimeBus, RuntimeEvent},
    errors::BridgeError,
    issuer::SessionIssuer,
    machine::{HandshakeMachine, HandshakeState, ResetCause},
    storage::{ExtensionStorage, persist_credential},
};

#[derive(Debug)]
enum WorkerRequest {
    Resync {
        reply: oneshot::Sender<Result<Uuid, BridgeError>>,
    },
}

pub struct BackgroundWorker {
    issuer: Arc<dyn SessionIssuer>,
    storage: Arc<dyn ExtensionStorage>,
    machine: Arc<HandshakeMachine>,
    runtime: RuntimeBus,

    /// User of the last successful re-sync; held for the whole re-sync.
    latest: Mutex<Option<Uuid>>,

    /// Successful re-syncs so far.
    completed: AtomicU64,
}

impl std::fmt::Debug for BackgroundWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundWorker")
            .field("storage", &self.storage)
            .field("machine", &self.machine)
            .finish_non_exhaustive()
    }
}

impl BackgroundWorker {
    #[must_use]
    pub fn new(
        issuer: Arc<dyn SessionIssuer>,
        storage: Arc<dyn ExtensionStorage>,
        machine: Arc<HandshakeMachine>,
        runtime: RuntimeBus,
    ) -> Self {
        Self {
            issuer,
            storage,
            machine,
            runtime,
            latest: Mutex::new(None),
            completed: AtomicU64::new(0),
        }
    }

    /// Start serving messages. The loop ends once every handle is dropped.
    pub fn spawn(self) -> (WorkerHandle, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<WorkerRequest>(16);
        let worker = Arc::new(self);

        let task = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let worker = worker.clone();

                tokio::spawn(async move { worker.handle(request).await });
            }

            debug!("background worker stopped");
        });

        (WorkerHandle { sender }, task)
    }

    async fn handle(&self, request: WorkerRequest) {
        match request {
            WorkerRequest::Resync { reply } => {
                let result = self.resync().await;

                if reply.send(result).is_err() {
                    debug!("resync requester went away");
                }
            }
        }
    }

    async fn resync(&self) -> Result<Uuid, BridgeError> {
        let seen = self.completed.load(Ordering::Acquire);
        let mut latest = self.latest.lock().await;

        if self.completed.load(Ordering::Acquire) != seen
            && let Some(user_id) = *latest
        {
            debug!(%user_id, "joining re-sync that finished while queued");

            return Ok(user_id);
        }

        if self.machine.reset_cause() == Some(ResetCause::Revoked) {
            debug!("user disconnected, refusing silent re-sync");

            return Err(BridgeError::ReconnectRequired);
        }

        let user_id = self.issue_and_persist().await?;

        *latest = Some(user_id);
        self.completed.fetch_add(1, Ordering::AcqRel);

        Ok(user_id)
    }

    /// Issue over the network and run the same writes as the capture path.
    async fn issue_and_persist(&self) -> Result<Uuid, BridgeError> {
        if self.machine.state() != HandshakeState::TokenRequested {
            self.machine.advance(HandshakeState::TokenRequested)?;
        }

        let payload = match self.issuer.issue().await {
            Ok(payload) => payload,
            Err(error) => {
                warn!("background issuance failed: {error}");
                self.machine.reset(ResetCause::IssuanceFailed);

                return Err(error);
            }
        };

        let user_id = payload.user_id;

        self.machine.advance(HandshakeState::Captured)?;
        persist_credential(self.storage.as_ref(), &self.machine, payload).await?;
        self.runtime.publish(RuntimeEvent::Connected { user_id });

        Ok(user_id)
    }
}

/// Sender side used by other contexts.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<WorkerRequest>,
}

impl WorkerHandle {
    /// Ask the worker to mint and store a fresh credential.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WorkerTimeout`] when no answer arrives within
    /// `limit`, [`BridgeError::WorkerUnavailable`] when the worker is gone, or
    /// whatever the worker itself failed with.
    pub async fn resync(&self, limit: Duration) -> Result<Uuid, BridgeError> {
        let (reply, response) = oneshot::channel();

        self.sender
            .send(WorkerRequest::Resync { reply })
            .await
            .map_err(|_closed| BridgeError::WorkerUnavailable)?;

        match timeout(limit, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_dropped)) => Err(BridgeError::WorkerUnavailable),
            Err(_elapsed) => Err(BridgeError::WorkerTimeout(limit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{issuer::MockSessionIssuer, payload::TransferPayload, storage::MemoryStorage};

    use super::*;

    fn spawn_worker(issuer: MockSessionIssuer) -> (WorkerHandle, Arc<MemoryStorage>, Arc<HandshakeMachine>, RuntimeBus) {
        let storage = Arc::new(MemoryStorage::new());
        let machine = Arc::new(HandshakeMachine::new());
        let runtime = RuntimeBus::new();

        let (handle, _task) = BackgroundWorker::new(
            Arc::new(issuer),
            storage.clone(),
            machine.clone(),
            runtime.clone(),
        )
        .spawn();

        (handle, storage, machine, runtime)
    }

    #[tokio::test]
    async fn resync_persists_and_announces() -> TestResult {
        let user_id = Uuid::now_v7();
        let mut issuer = MockSessionIssuer::new();

        issuer.expect_issue().once().return_once(move || {
            Ok(TransferPayload {
                token: "t".repeat(64),
                user_id,
            })
        });

        let (handle, storage, machine, runtime) = spawn_worker(issuer);
        let mut events = runtime.subscribe();

        assert_eq!(handle.resync(Duration::from_secs(5)).await?, user_id);
        assert_eq!(storage.local().await?.map(|c| c.user_id), Some(user_id));
        assert_eq!(machine.state(), HandshakeState::Synced);
        assert_eq!(events.recv().await?, RuntimeEvent::Connected { user_id });

        Ok(())
    }

    #[tokio::test]
    async fn failed_issuance_resets_to_disconnected() -> TestResult {
        let mut issuer = MockSessionIssuer::new();

        issuer
            .expect_issue()
            .once()
            .return_once(|| Err(BridgeError::Unauthenticated));

        let (handle, storage, machine, _runtime) = spawn_worker(issuer);

        assert!(matches!(
            handle.resync(Duration::from_secs(5)).await,
            Err(BridgeError::Unauthenticated)
        ));
        assert_eq!(machine.state(), HandshakeState::Disconnected);
        assert_eq!(storage.local().await?, None);

        Ok(())
    }

    /// Hands out `token-0`, `token-1`, ... after a short delay.
    #[derive(Debug)]
    struct CountingIssuer {
        user_id: Uuid,
        issued: AtomicU64,
    }

    #[async_trait::async_trait]
    impl SessionIssuer for CountingIssuer {
        async fn issue(&self) -> Result<TransferPayload, BridgeError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(100)).await;

            Ok(TransferPayload {
                token: format!("token-{n}-{}", "t".repeat(56)),
                user_id: self.user_id,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_resyncs_share_one_issuance() -> TestResult {
        let user_id = Uuid::now_v7();
        let issuer = Arc::new(CountingIssuer {
            user_id,
            issued: AtomicU64::new(0),
        });
        let storage = Arc::new(MemoryStorage::new());
        let machine = Arc::new(HandshakeMachine::new());

        let (handle, _task) = BackgroundWorker::new(
            issuer.clone(),
            storage.clone(),
            machine.clone(),
            RuntimeBus::new(),
        )
        .spawn();

        let (first, second) = tokio::join!(
            handle.resync(Duration::from_secs(5)),
            handle.resync(Duration::from_secs(5))
        );

        assert_eq!(first?, user_id);
        assert_eq!(second?, user_id);
        assert_eq!(issuer.issued.load(Ordering::SeqCst), 1, "second re-sync minted a token");
        assert!(
            storage
                .local()
                .await?
                .is_some_and(|credential| credential.token.starts_with("token-0-")),
            "stored token is not the one issued"
        );
        assert_eq!(machine.state(), HandshakeState::Synced);

        Ok(())
    }

    #[tokio::test]
    async fn user_disconnect_blocks_silent_resync() -> TestResult {
        let issuer = MockSessionIssuer::new();
        let (handle, storage, machine, _runtime) = spawn_worker(issuer);

        machine.advance(HandshakeState::TokenRequested)?;
        machine.reset(ResetCause::Revoked);

        assert!(matches!(
            handle.resync(Duration::from_secs(5)).await,
            Err(BridgeError::ReconnectRequired)
        ));
        assert_eq!(storage.local().await?, None);

        Ok(())
    }

    #[derive(Debug)]
    struct NeverIssuer;

    #[async_trait::async_trait]
    impl SessionIssuer for NeverIssuer {
        async fn issue(&self) -> Result<TransferPayload, BridgeError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn caller_gives_up_after_its_timeout() -> TestResult {
        let (handle, _task) = BackgroundWorker::new(
            Arc::new(NeverIssuer),
            Arc::new(MemoryStorage::new()),
            Arc::new(HandshakeMachine::new()),
            RuntimeBus::new(),
        )
        .spawn();

        assert!(matches!(
            handle.resync(Duration::from_secs(3)).await,
            Err(BridgeError::WorkerTimeout(limit)) if limit == Duration::from_secs(3)
        ));

        Ok(())
    }
}
