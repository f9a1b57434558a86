//! # Counter Database
//!
//! SQLite pool behind [`SqliteSequenceStore`].
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CUENTAS_STORE=sqlite                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(<data_dir>/cuentas.db)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config)   open (create if missing) ─► WAL ─► migrate    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.counter() ──► SqliteSequenceStore (shares the pool)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Several server processes may point at the same file. A writer that finds
//! the database locked waits up to `busy_timeout` before the commit fails.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::counter::SqliteSequenceStore;

// =============================================================================
// Configuration
// =============================================================================

/// Where and how to open the counter database.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/cuentas/cuentas.db").busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database file; `None` keeps everything in memory.
    pub path: Option<PathBuf>,

    /// Pool size.
    pub max_connections: u32,

    /// How long a connection waits on a locked database.
    pub busy_timeout: Duration,

    /// Apply pending migrations after connecting.
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed database at `path`, created when missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: Some(path.into()),
            max_connections: 2,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory database. One connection, since every connection
    /// would otherwise see its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            path: None,
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = match &self.path {
            Some(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
            None => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::Open(e.to_string()))?,
        };
        Ok(options.busy_timeout(self.busy_timeout))
    }

    fn describe(&self) -> String {
        self.path
            .as_deref()
            .map(Path::display)
            .map(|p| p.to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }
}

// =============================================================================
// Database
// =============================================================================

/// Open counter database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and, unless disabled, migrates.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let target = config.describe();
        info!(database = %target, "Opening counter database");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            // An idle in-memory pool must not drop its only connection.
            .min_connections(if config.path.is_none() { 1 } else { 0 })
            .idle_timeout(config.path.as_ref().map(|_| Duration::from_secs(600)))
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::Open(format!("{target}: {e}")))?;

        debug!(
            database = %target,
            max_connections = config.max_connections,
            "Counter database pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The Sequence Store over this database.
    pub fn counter(&self) -> SqliteSequenceStore {
        SqliteSequenceStore::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cuentas_core::SequenceStore;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.counter().read().await.unwrap(), 1);

        db.close().await;
        assert!(db.pool().is_closed());
        assert!(db.counter().read().await.is_err());
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cuentas.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        db.counter().commit(31).await.unwrap();
        db.close().await;
        assert!(path.exists());

        let reopened = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(reopened.counter().read().await.unwrap(), 31);
    }

    #[tokio::test]
    async fn test_without_migrations_the_table_is_missing() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        assert!(db.counter().read().await.is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/cuentas.db")
            .max_connections(0)
            .busy_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.describe(), "/tmp/cuentas.db");
        assert_eq!(DbConfig::in_memory().describe(), ":memory:");
    }
}
