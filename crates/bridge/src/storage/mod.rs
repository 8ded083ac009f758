//! Extension storage.
//!
//! Two areas mirror what a browser extension gets: `local` stays on this
//! device and holds the bearer token, `sync` follows the user across devices
//! and only ever says who is connected. The types keep the token out of the
//! synced area.

mod file;
mod memory;

use std::{fmt, fmt::Debug};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    errors::BridgeError,
    machine::{HandshakeMachine, HandshakeState},
    payload::TransferPayload,
};

pub use crate::errors::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Contents of the local area.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalCredential {
    pub token: String,
    pub user_id: Uuid,
}

impl Debug for LocalCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCredential")
            .field("token", &"**redacted**")
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl From<TransferPayload> for LocalCredential {
    fn from(payload: TransferPayload) -> Self {
        Self {
            token: payload.token,
            user_id: payload.user_id,
        }
    }
}

/// Contents of the synced area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedStatus {
    pub user_id: Uuid,
    pub connected: bool,
}

/// Change notification, emitted after the write lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageChange {
    Local { present: bool },
    Sync(Option<SyncedStatus>),
}

#[async_trait]
pub trait ExtensionStorage: Debug + Send + Sync {
    async fn local(&self) -> Result<Option<LocalCredential>, StorageError>;

    async fn set_local(&self, credential: LocalCredential) -> Result<(), StorageError>;

    async fn synced(&self) -> Result<Option<SyncedStatus>, StorageError>;

    async fn set_synced(&self, status: SyncedStatus) -> Result<(), StorageError>;

    /// Empty both areas.
    async fn clear(&self) -> Result<(), StorageError>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Write a captured credential: clear, then local, then sync.
///
/// Safe to repeat; a second run overwrites with an equivalent credential.
///
/// # Errors
///
/// Returns [`BridgeError::Storage`] when a write fails, or
/// [`BridgeError::InvalidTransition`] when the machine is not at `Captured`.
pub async fn persist_credential(
    storage: &dyn ExtensionStorage,
    machine: &HandshakeMachine,
    payload: TransferPayload,
) -> Result<(), BridgeError> {
    let user_id = payload.user_id;

    storage.clear().await?;
    storage.set_local(payload.into()).await?;
    machine.advance(HandshakeState::PersistedLocally)?;

    storage
        .set_synced(SyncedStatus {
            user_id,
            connected: true,
        })
        .await?;
    machine.advance(HandshakeState::Synced)?;

    Ok(())
}
