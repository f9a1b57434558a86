//! # Counter Repository
//!
//! The invoice counter as a single SQLite row.
//!
//! ## Compare-and-Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SINGLE TRANSACTION                                   │
//! │                                                                         │
//! │  1. UPDATE invoice_counter SET counter = :next                          │
//! │     WHERE id = 1 AND counter = :expected                                │
//! │       │                                                                 │
//! │       ├── 1 row  → COMMIT                                              │
//! │       │                                                                 │
//! │       └── 0 rows → row missing and expected == 1?                      │
//! │                      ├── yes → INSERT (id = 1) unless present          │
//! │                      │          ├── inserted → COMMIT                  │
//! │                      │          └── present  → Conflict                │
//! │                      └── no  → Conflict(found = current row)           │
//! │                                                                         │
//! │  The write comes first, so the transaction holds the SQLite write      │
//! │  lock before anything else is looked at.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::DbError;
use cuentas_core::sequence::{check_commit_value, normalize_counter};
use cuentas_core::{SequenceStore, StoreError, INITIAL_COUNTER};

/// Sequence Store backed by the `invoice_counter` table.
#[derive(Debug, Clone)]
pub struct SqliteSequenceStore {
    pool: SqlitePool,
}

impl SqliteSequenceStore {
    /// Creates a new SqliteSequenceStore.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteSequenceStore { pool }
    }

    async fn stored(&self) -> Result<Option<u64>, StoreError> {
        let row: Option<i64> =
            sqlx::query_scalar("SELECT counter FROM invoice_counter WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;
        row.map(from_column).transpose()
    }
}

#[async_trait]
impl SequenceStore for SqliteSequenceStore {
    async fn read(&self) -> Result<u64, StoreError> {
        Ok(normalize_counter(self.stored().await?))
    }

    async fn commit(&self, next: u64) -> Result<(), StoreError> {
        check_commit_value(next)?;
        let value = to_column(next)?;

        sqlx::query(
            r#"
            INSERT INTO invoice_counter (id, counter) VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET counter = excluded.counter
            "#,
        )
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        debug!(counter = next, "Counter row written");
        Ok(())
    }

    async fn compare_and_commit(&self, expected: u64, next: u64) -> Result<(), StoreError> {
        check_commit_value(next)?;
        let next_value = to_column(next)?;
        let expected_value = to_column(expected)?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // A stored 0 reads as 1, so it satisfies expected == 1 too.
        let updated = sqlx::query(
            r#"
            UPDATE invoice_counter SET counter = ?1
            WHERE id = 1 AND (counter = ?2 OR (?2 = 1 AND counter = 0))
            "#,
        )
        .bind(next_value)
        .bind(expected_value)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?
        .rows_affected();

        if updated == 0 {
            let inserted = if expected == INITIAL_COUNTER {
                sqlx::query(
                    "INSERT INTO invoice_counter (id, counter) VALUES (1, ?1) ON CONFLICT(id) DO NOTHING",
                )
                .bind(next_value)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)?
                .rows_affected()
            } else {
                0
            };

            if inserted == 0 {
                let found = current_in(&mut tx).await?;
                tx.rollback().await.map_err(DbError::from)?;
                return Err(StoreError::Conflict { expected, found });
            }
        }

        tx.commit().await.map_err(DbError::from)?;
        debug!(expected, counter = next, "Counter row advanced");
        Ok(())
    }
}

async fn current_in(tx: &mut Transaction<'_, Sqlite>) -> Result<u64, StoreError> {
    let row: Option<i64> = sqlx::query_scalar("SELECT counter FROM invoice_counter WHERE id = 1")
        .fetch_optional(&mut **tx)
        .await
        .map_err(DbError::from)?;
    Ok(normalize_counter(row.map(from_column).transpose()?))
}

fn to_column(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidValue(value))
}

fn from_column(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative counter {value}")))
}

// =============================================================================
// Unit Tests
// =============================================================================
