//! Connection observer: flips surfaces to connected without a reload.

use std::sync::Arc;

use tokio::sync::{
    broadcast::{self, error::RecvError},
    watch,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    channel::RuntimeEvent,
    machine::{HandshakeMachine, HandshakeState},
    storage::StorageChange,
};

/// Follows storage changes and runtime broadcasts.
///
/// Publishes the connected user (or `None`) on a watch channel and completes
/// the handshake once the synced area is written.
#[derive(Debug)]
pub struct ConnectionObserver {
    machine: Arc<HandshakeMachine>,
    connected: watch::Sender<Option<Uuid>>,
}

impl ConnectionObserver {
    #[must_use]
    pub fn new(machine: Arc<HandshakeMachine>, initial: Option<Uuid>) -> Self {
        let (connected, _receiver) = watch::channel(initial);

        Self { machine, connected }
    }

    pub fn watch(&self) -> watch::Receiver<Option<Uuid>> {
        self.connected.subscribe()
    }

    pub async fn run(
        self,
        mut storage: broadcast::Receiver<StorageChange>,
        mut runtime: broadcast::Receiver<RuntimeEvent>,
    ) {
        let mut storage_open = true;
        let mut runtime_open = true;

        while storage_open || runtime_open {
            tokio::select! {
                change = storage.recv(), if storage_open => match change {
                    Ok(StorageChange::Sync(Some(status))) if status.connected => {
                        self.mark_connected(status.user_id);
                    }
                    Ok(StorageChange::Sync(None)) => self.mark_disconnected(),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "storage changes lagged"),
                    Err(RecvError::Closed) => storage_open = false,
                },
                event = runtime.recv(), if runtime_open => match event {
                    Ok(RuntimeEvent::Connected { user_id }) => self.mark_connected(user_id),
                    Ok(RuntimeEvent::Disconnected) => self.mark_disconnected(),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "runtime events lagged"),
                    Err(RecvError::Closed) => runtime_open = false,
                },
            }
        }

        debug!("connection observer stopped");
    }

    fn mark_connected(&self, user_id: Uuid) {
        self.connected.send_if_modified(|current| {
            let changed = *current != Some(user_id);
            *current = Some(user_id);
            changed
        });

        if self.machine.state() == HandshakeState::Synced
            && let Err(source) = self.machine.advance(HandshakeState::Connected)
        {
            debug!("connection already settled: {source}");
        }
    }

    fn mark_disconnected(&self) {
        self.connected.send_if_modified(|current| current.take().is_some());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use testresult::TestResult;

    use crate::{
        channel::RuntimeBus,
        storage::{ExtensionStorage, MemoryStorage, SyncedStatus},
    };

    use super::*;

    #[tokio::test]
    async fn runtime_broadcast_completes_handshake() -> TestResult {
        let machine = Arc::new(HandshakeMachine::at(HandshakeState::Synced));
        let storage = MemoryStorage::new();
        let runtime = RuntimeBus::new();
        let user_id = Uuid::now_v7();

        let observer = ConnectionObserver::new(machine.clone(), None);
        let connected = observer.watch();
        let mut states = machine.subscribe();

        tokio::spawn(observer.run(storage.subscribe(), runtime.subscribe()));

        runtime.publish(RuntimeEvent::Connected { user_id });

        tokio::time::timeout(
            Duration::from_secs(1),
            states.wait_for(|state| *state == HandshakeState::Connected),
        )
        .await??;

        assert_eq!(*connected.borrow(), Some(user_id));

        Ok(())
    }

    #[tokio::test]
    async fn storage_changes_flip_connection_state() -> TestResult {
        let machine = Arc::new(HandshakeMachine::new());
        let storage = MemoryStorage::new();
        let runtime = RuntimeBus::new();
        let user_id = Uuid::now_v7();

        let observer = ConnectionObserver::new(machine, None);
        let mut connected = observer.watch();

        tokio::spawn(observer.run(storage.subscribe(), runtime.subscribe()));

        storage
            .set_synced(SyncedStatus {
                user_id,
                connected: true,
            })
            .await?;
        tokio::time::timeout(Duration::from_secs(1), connected.changed()).await??;
        assert_eq!(*connected.borrow_and_update(), Some(user_id));

        storage.clear().await?;
        tokio::time::timeout(Duration::from_secs(1), connected.changed()).await??;
        assert_eq!(*connected.borrow(), None);

        Ok(())
    }
}
