//! Sessions Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query_as};
use uuid::Uuid;

use crate::users::UserUuid;

const FIND_SESSION_BY_TOKEN_HASH_SQL: &str = include_str!("sql/find_session_by_token_hash.sql");

#[derive(Debug, Clone)]
pub(crate) struct SessionRecord {
    pub(crate) uuid: Uuid,
    pub(crate) user_uuid: UserUuid,
    pub(crate) expires_at: Timestamp,
}

#[derive(Debug, Clone)]
pub(crate) struct PgSessionsRepository {
    pool: PgPool,
}

impl PgSessionsRepository {
    #[must_use]
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<SessionRecord>, sqlx::Error> {
        query_as::<Postgres, SessionRecord>(FIND_SESSION_BY_TOKEN_HASH_SQL)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for SessionRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: row.try_get("uuid")?,
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
        })
    }
}
