use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::storage::{
    ExtensionStorage, LocalCredential, StorageChange, StorageError, SyncedStatus,
};

#[derive(Debug, Default)]
struct Areas {
    local: Option<LocalCredential>,
    sync: Option<SyncedStatus>,
}

/// Storage that lives and dies with the process.
#[derive(Debug)]
pub struct MemoryStorage {
    areas: Mutex<Areas>,
    changes: broadcast::Sender<StorageChange>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _receiver) = broadcast::channel(16);

        Self {
            areas: Mutex::new(Areas::default()),
            changes,
        }
    }

    fn notify(&self, change: StorageChange) {
        let _receivers = self.changes.send(change);
    }
}

#[async_trait]
impl ExtensionStorage for MemoryStorage {
    async fn local(&self) -> Result<Option<LocalCredential>, StorageError> {
        Ok(self
            .areas
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .local
            .clone())
    }

    async fn set_local(&self, credential: LocalCredential) -> Result<(), StorageError> {
        self.areas
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .local = Some(credential);

        self.notify(StorageChange::Local { present: true });

        Ok(())
    }

    async fn synced(&self) -> Result<Option<SyncedStatus>, StorageError> {
        Ok(self.areas.lock().unwrap_or_else(PoisonError::into_inner).sync)
    }

    async fn set_synced(&self, status: SyncedStatus) -> Result<(), StorageError> {
        self.areas.lock().unwrap_or_else(PoisonError::into_inner).sync = Some(status);

        self.notify(StorageChange::Sync(Some(status)));

        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.areas.lock().unwrap_or_else(PoisonError::into_inner) = Areas::default();

        self.notify(StorageChange::Local { present: false });
        self.notify(StorageChange::Sync(None));

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
