//! Rate Limits Repository

use async_trait::async_trait;
use mockall::automock;
use sqlx::{PgPool, query, query_scalar};

use crate::database::is_unique_violation;

const INCREMENT_WINDOW_SQL: &str = include_str!("sql/increment_window.sql");
const FIND_WINDOW_SQL: &str = include_str!("sql/find_window.sql");
const INSERT_WINDOW_SQL: &str = include_str!("sql/insert_window.sql");
const PRUNE_WINDOWS_SQL: &str = include_str!("sql/prune_windows.sql");

/// Result of trying to open a new window row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,

    /// Another caller created the `(key, window_start)` row first.
    Conflict,
}

#[derive(Debug, Clone)]
pub struct PgRateLimitRepository {
    pool: PgPool,
}

impl PgRateLimitRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitRepository for PgRateLimitRepository {
    async fn increment_below(
        &self,
        key: &str,
        window_start: i64,
        max_requests: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        query_scalar::<_, i32>(INCREMENT_WINDOW_SQL)
            .bind(key)
            .bind(window_start)
            .bind(max_requests)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_count(&self, key: &str, window_start: i64) -> Result<Option<i32>, sqlx::Error> {
        query_scalar::<_, i32>(FIND_WINDOW_SQL)
            .bind(key)
            .bind(window_start)
            .fetch_optional(&self.pool)
            .await
    }

    async fn insert_first(
        &self,
        key: &str,
        window_start: i64,
    ) -> Result<InsertOutcome, sqlx::Error> {
        match query(INSERT_WINDOW_SQL)
            .bind(key)
            .bind(window_start)
            .execute(&self.pool)
            .await
        {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(error) if is_unique_violation(&error) => Ok(InsertOutcome::Conflict),
            Err(error) => Err(error),
        }
    }

    async fn prune_before(&self, window_start: i64) -> Result<u64, sqlx::Error> {
        Ok(query(PRUNE_WINDOWS_SQL)
            .bind(window_start)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }
}

/// Storage contract for fixed-window counters.
#[automock]
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Atomically bump the counter if it is still below `max_requests`.
    ///
    /// Returns the new count, or `None` when the row is missing or already full.
    async fn increment_below(
        &self,
        key: &str,
        window_start: i64,
        max_requests: i32,
    ) -> Result<Option<i32>, sqlx::Error>;

    async fn find_count(&self, key: &str, window_start: i64) -> Result<Option<i32>, sqlx::Error>;

    /// Create the window row with a count of one.
    async fn insert_first(&self, key: &str, window_start: i64)
    -> Result<InsertOutcome, sqlx::Error>;

    /// Delete rows for windows that started before `window_start`.
    async fn prune_before(&self, window_start: i64) -> Result<u64, sqlx::Error>;
}
