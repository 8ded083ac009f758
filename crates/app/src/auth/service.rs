//! Auth service.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use jiff::SignedDuration;
use mockall::automock;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        AuthServiceError, CredentialMetadata, IssuedToken, NewCredential,
        repository::{CredentialRepository, PgCredentialRepository},
        generate_token_secret, hash_token, validate_token,
    },
    clock::Clock,
    database::bounded,
    users::UserUuid,
};

/// Lifetime of a freshly issued credential.
pub const DEFAULT_TOKEN_TTL: SignedDuration = SignedDuration::from_hours(24 * 90);

/// Upper bound for a single credential store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub token_ttl: SignedDuration,
    pub store_timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_ttl: DEFAULT_TOKEN_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct TokenAuthService {
    repository: Arc<dyn CredentialRepository>,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
}

impl TokenAuthService {
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, settings: AuthSettings) -> Self {
        Self::from_repository(Arc::new(PgCredentialRepository::new(pool)), clock, settings)
    }

    #[must_use]
    pub fn from_repository(
        repository: Arc<dyn CredentialRepository>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            repository,
            clock,
            settings,
        }
    }
}

#[async_trait]
impl AuthService for TokenAuthService {
    async fn issue_token(&self, user: UserUuid) -> Result<IssuedToken, AuthServiceError> {
        let secret = generate_token_secret();
        let token = secret.encode();

        let expires_at = self
            .clock
            .now()
            .checked_add(self.settings.token_ttl)
            .map_err(AuthServiceError::Expiry)?;

        let record = bounded(
            self.settings.store_timeout,
            self.repository.replace_user_credential(NewCredential {
                uuid: Uuid::now_v7(),
                user_uuid: user,
                token_hash: hash_token(&token),
                expires_at,
            }),
        )
        .await?;

        info!(user = %user, credential = %record.uuid, "issued extension credential");

        Ok(IssuedToken {
            token,
            user_uuid: record.user_uuid,
            expires_at: record.expires_at,
        })
    }

    async fn authenticate_bearer(&self, token: &str) -> Result<UserUuid, AuthServiceError> {
        let token = validate_token(token)?;

        let record = bounded(
            self.settings.store_timeout,
            self.repository.find_by_token_hash(&hash_token(token)),
        )
        .await?
        .ok_or(AuthServiceError::CredentialNotFound)?;

        if record.expires_at <= self.clock.now() {
            // Self-cleaning: the next presentation of this token is a plain miss.
            match bounded(
                self.settings.store_timeout,
                self.repository.delete_credential(record.uuid),
            )
            .await
            {
                Ok(_deleted) => {
                    debug!(credential = %record.uuid, "removed expired credential");
                }
                Err(source) => {
                    warn!(credential = %record.uuid, "failed to remove expired credential: {source}");
                }
            }

            return Err(AuthServiceError::CredentialExpired);
        }

        Ok(record.user_uuid)
    }

    async fn revoke_user_tokens(&self, user: UserUuid) -> Result<u64, AuthServiceError> {
        let revoked = bounded(
            self.settings.store_timeout,
            self.repository.delete_user_credentials(user),
        )
        .await?;

        info!(user = %user, revoked, "revoked extension credentials");

        Ok(revoked)
    }

    async fn list_user_tokens(
        &self,
        user: UserUuid,
    ) -> Result<Vec<CredentialMetadata>, AuthServiceError> {
        let records = bounded(
            self.settings.store_timeout,
            self.repository.list_user_credentials(user),
        )
        .await?;

        Ok(records.into_iter().map(CredentialMetadata::from).collect())
    }
}

/// Issuance and verification of extension bearer credentials.
#[automock]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Mint a token for `user`, replacing any credential it already holds.
    async fn issue_token(&self, user: UserUuid) -> Result<IssuedToken, AuthServiceError>;

    /// Resolve the user behind a presented bearer token.
    async fn authenticate_bearer(&self, token: &str) -> Result<UserUuid, AuthServiceError>;

    /// Delete every credential held by `user`. Returns the number removed.
    async fn revoke_user_tokens(&self, user: UserUuid) -> Result<u64, AuthServiceError>;

    async fn list_user_tokens(
        &self,
        user: UserUuid,
    ) -> Result<Vec<CredentialMetadata>, AuthServiceError>;
}
