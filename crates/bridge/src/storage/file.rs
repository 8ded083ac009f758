//! Directory-backed storage: `local.json` and `sync.json`.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::broadcast;
use tracing::debug;

use crate::storage::{
    ExtensionStorage, LocalCredential, StorageChange, StorageError, SyncedStatus,
};

const LOCAL_FILE: &str = "local.json";
const SYNC_FILE: &str = "sync.json";

#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    changes: broadcast::Sender<StorageChange>,
}

impl FileStorage {
    /// Open (creating if needed) the storage directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::Io {
                path: dir.clone(),
                source,
            })?;

        let (changes, _receiver) = broadcast::channel(16);

        Ok(Self { dir, changes })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn notify(&self, change: StorageChange) {
        let _receivers = self.changes.send(change);
    }

    async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        let path = self.dir.join(name);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Corrupt { path, source })
    }

    async fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let path = self.dir.join(name);

        let content = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Corrupt {
            path: path.clone(),
            source,
        })?;

        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &content))
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.join(name),
                source: io::Error::other(source),
            })?
    }

    async fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.dir.join(name);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

/// Temp file in the same directory, then rename over the target.
fn write_atomic(dir: &Path, path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let io_error = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;

    temp.write_all(content).map_err(io_error)?;
    temp.as_file().sync_all().map_err(io_error)?;

    temp.persist(path).map_err(|source| StorageError::Persist {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), "storage area written");

    Ok(())
}

#[async_trait]
impl ExtensionStorage for FileStorage {
    async fn local(&self) -> Result<Option<LocalCredential>, StorageError> {
        self.read(LOCAL_FILE).await
    }

    async fn set_local(&self, credential: LocalCredential) -> Result<(), StorageError> {
        self.write(LOCAL_FILE, &credential).await?;
        self.notify(StorageChange::Local { present: true });

        Ok(())
    }

    async fn synced(&self) -> Result<Option<SyncedStatus>, StorageError> {
        self.read(SYNC_FILE).await
    }

    async fn set_synced(&self, status: SyncedStatus) -> Result<(), StorageError> {
        self.write(SYNC_FILE, &status).await?;
        self.notify(StorageChange::Sync(Some(status)));

        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.remove(LOCAL_FILE).await?;
        self.notify(StorageChange::Local { present: false });

        self.remove(SYNC_FILE).await?;
        self.notify(StorageChange::Sync(None));

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
