//! Database connection management

use std::{future::Future, time::Duration};

use sqlx::{
    PgPool,
    error::{DatabaseError, ErrorKind},
    migrate::MigrateError,
};
use thiserror::Error;

/// Failure talking to the shared store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("storage error")]
    Sql(#[source] sqlx::Error),
}

/// Connect to `PostgreSQL`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect(database_url).await
}

/// Apply the bundled schema migrations.
///
/// # Errors
///
/// Returns an error if any migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// Run a store call with `limit` as its upper bound.
///
/// # Errors
///
/// Returns [`StoreError::Timeout`] when the call does not finish in time, or
/// [`StoreError::Sql`] when it fails.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(StoreError::Sql),
        Err(_elapsed) => Err(StoreError::Timeout(limit)),
    }
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error.as_database_error().map(DatabaseError::kind),
        Some(ErrorKind::UniqueViolation)
    )
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[tokio::test]
    async fn bounded_passes_through_successful_calls() {
        let result = bounded(Duration::from_secs(1), future::ready(Ok::<_, sqlx::Error>(7))).await;

        assert!(matches!(result, Ok(7)));
    }

    #[tokio::test]
    async fn bounded_wraps_sql_errors() {
        let result = bounded(
            Duration::from_secs(1),
            future::ready(Err::<(), _>(sqlx::Error::PoolTimedOut)),
        )
        .await;

        assert!(matches!(result, Err(StoreError::Sql(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out_pending_calls() {
        let result = bounded(
            Duration::from_millis(50),
            future::pending::<Result<(), sqlx::Error>>(),
        )
        .await;

        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
