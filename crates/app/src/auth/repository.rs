//! Credential repository.

use async_trait::async_trait;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use mockall::automock;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query, query_as};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::records::{CredentialRecord, NewCredential},
    database::is_unique_violation,
    users::UserUuid,
};

const DELETE_USER_CREDENTIALS_SQL: &str = include_str!("sql/delete_user_credentials.sql");
const INSERT_CREDENTIAL_SQL: &str = include_str!("sql/insert_credential.sql");
const FIND_CREDENTIAL_BY_TOKEN_HASH_SQL: &str =
    include_str!("sql/find_credential_by_token_hash.sql");
const DELETE_CREDENTIAL_SQL: &str = include_str!("sql/delete_credential.sql");
const LIST_USER_CREDENTIALS_SQL: &str = include_str!("sql/list_user_credentials.sql");

/// Rounds of delete-then-insert before a contended replace gives up.
const MAX_REPLACE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct PgCredentialRepository {
    pool: PgPool,
}

impl PgCredentialRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn try_replace(&self, credential: &NewCredential) -> Result<CredentialRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        query(DELETE_USER_CREDENTIALS_SQL)
            .bind(credential.user_uuid.into_uuid())
            .execute(&mut *tx)
            .await?;

        let record = query_as::<Postgres, CredentialRecord>(INSERT_CREDENTIAL_SQL)
            .bind(credential.uuid)
            .bind(credential.user_uuid.into_uuid())
            .bind(credential.token_hash.as_str())
            .bind(SqlxTimestamp::from(credential.expires_at))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(record)
    }
}

#[async_trait]
impl CredentialRepository for PgCredentialRepository {
    async fn replace_user_credential(
        &self,
        credential: NewCredential,
    ) -> Result<CredentialRecord, sqlx::Error> {
        let mut attempt = 1;

        loop {
            match self.try_replace(&credential).await {
                // A concurrent issuance for the same user committed first; replace its row.
                Err(error) if is_unique_violation(&error) && attempt < MAX_REPLACE_ATTEMPTS => {
                    debug!(user_uuid = %credential.user_uuid, attempt, "credential replace raced");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<CredentialRecord>, sqlx::Error> {
        query_as::<Postgres, CredentialRecord>(FIND_CREDENTIAL_BY_TOKEN_HASH_SQL)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_credential(&self, uuid: Uuid) -> Result<u64, sqlx::Error> {
        Ok(query(DELETE_CREDENTIAL_SQL)
            .bind(uuid)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    async fn delete_user_credentials(&self, user: UserUuid) -> Result<u64, sqlx::Error> {
        Ok(query(DELETE_USER_CREDENTIALS_SQL)
            .bind(user.into_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    async fn list_user_credentials(
        &self,
        user: UserUuid,
    ) -> Result<Vec<CredentialRecord>, sqlx::Error> {
        query_as::<Postgres, CredentialRecord>(LIST_USER_CREDENTIALS_SQL)
            .bind(user.into_uuid())
            .fetch_all(&self.pool)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for CredentialRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: row.try_get("uuid")?,
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            token_hash: row.try_get("token_hash")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
        })
    }
}

/// Storage contract for hashed extension credentials.
#[automock]
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Delete every credential for the user and insert `credential`, atomically.
    async fn replace_user_credential(
        &self,
        credential: NewCredential,
    ) -> Result<CredentialRecord, sqlx::Error>;

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<CredentialRecord>, sqlx::Error>;

    async fn delete_credential(&self, uuid: Uuid) -> Result<u64, sqlx::Error>;

    async fn delete_user_credentials(&self, user: UserUuid) -> Result<u64, sqlx::Error>;

    async fn list_user_credentials(
        &self,
        user: UserUuid,
    ) -> Result<Vec<CredentialRecord>, sqlx::Error>;
}
