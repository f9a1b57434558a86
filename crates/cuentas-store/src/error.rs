//! # Database Error Types
//!
//! Failures of the SQLite-backed counter, before they are folded into the
//! core's [`StoreError`].
//!
//! ```text
//! sqlx::Error ──► DbError ──► StoreError::Database ──► ApiError STORAGE_ERROR
//! ```

use cuentas_core::StoreError;
use thiserror::Error;

/// SQLite result code for a locked database.
const SQLITE_BUSY: &str = "5";

/// Counter database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// The database file could not be opened or created.
    #[error("Cannot open counter database: {0}")]
    Open(String),

    /// The embedded schema could not be applied.
    #[error("Counter schema migration failed: {0}")]
    Migration(String),

    /// Another writer held the database longer than the busy timeout, or no
    /// pooled connection became free in time.
    #[error("Counter database is busy")]
    Busy,

    /// A statement failed.
    #[error("Counter query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(SQLITE_BUSY) => {
                DbError::Busy
            }
            sqlx::Error::Database(db_err) => DbError::Query(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::Busy,
            sqlx::Error::PoolClosed => DbError::Open("pool is closed".to_string()),
            other => DbError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_map() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::Busy
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::Open(_)
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::Query(_)
        ));
    }

    #[test]
    fn test_folds_into_store_error() {
        let err: StoreError = DbError::Query("no such table: invoice_counter".to_string()).into();
        match err {
            StoreError::Database(msg) => {
                assert_eq!(msg, "Counter query failed: no such table: invoice_counter")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
