//! Credential Records

use std::fmt;

use jiff::Timestamp;
use uuid::Uuid;

use crate::users::UserUuid;

/// Persisted extension credential. Holds the hash, never the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub uuid: Uuid,
    pub user_uuid: UserUuid,
    pub token_hash: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

/// New credential persistence payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub uuid: Uuid,
    pub user_uuid: UserUuid,
    pub token_hash: String,
    pub expires_at: Timestamp,
}

/// Credential metadata safe to display to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialMetadata {
    pub uuid: Uuid,
    pub user_uuid: UserUuid,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl From<CredentialRecord> for CredentialMetadata {
    fn from(record: CredentialRecord) -> Self {
        Self {
            uuid: record.uuid,
            user_uuid: record.user_uuid,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

/// Issuance result carrying the one-time raw token.
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub user_uuid: UserUuid,
    pub expires_at: Timestamp,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"**redacted**")
            .field("user_uuid", &self.user_uuid)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
