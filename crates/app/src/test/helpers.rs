//! Test Helpers

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::query;
use uuid::Uuid;

use crate::{auth::hash_token, test::TestContext, users::UserUuid};

/// Insert a first-party web session the way the web application would.
pub(crate) async fn insert_session(
    ctx: &TestContext,
    user: UserUuid,
    cookie_value: &str,
    expires_at: Timestamp,
) {
    query(
        "INSERT INTO sessions (uuid, user_uuid, token_hash, expires_at) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::now_v7())
    .bind(user.into_uuid())
    .bind(hash_token(cookie_value))
    .bind(SqlxTimestamp::from(expires_at))
    .execute(ctx.db.pool())
    .await
    .expect("Failed to insert test session");
}

/// Number of credential rows stored for `user`.
pub(crate) async fn count_credentials(ctx: &TestContext, user: UserUuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM extension_tokens WHERE user_uuid = $1")
        .bind(user.into_uuid())
        .fetch_one(ctx.db.pool())
        .await
        .expect("Failed to count credentials")
}
