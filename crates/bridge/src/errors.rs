//! Bridge errors.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::machine::HandshakeState;

/// Failure reading or writing extension storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to persist {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    #[error("stored state in {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("transit slot failed")]
    Transit(#[source] io::Error),

    #[error("transit payload is not valid")]
    TransitPayload(#[source] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The ambient session was missing or rejected by the server.
    #[error("web session is not signed in")]
    Unauthenticated,

    #[error("rate limited, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("server returned {status}")]
    UnexpectedStatus { status: u16 },

    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        from: HandshakeState,
        to: HandshakeState,
    },

    #[error("background worker did not answer within {0:?}")]
    WorkerTimeout(Duration),

    #[error("background worker is gone")]
    WorkerUnavailable,

    /// The credential is gone and a silent re-sync did not help. The user has
    /// to connect again from the web application.
    #[error("reconnect required")]
    ReconnectRequired,
}
