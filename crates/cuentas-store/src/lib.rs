//! # cuentas-store: Durable Sequence Store Backends
//!
//! Implementations of [`cuentas_core::SequenceStore`] that survive restarts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Counter Persistence                              │
//! │                                                                         │
//! │  InvoiceService (cuentas-core)                                         │
//! │       │ read / compare_and_commit                                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  cuentas-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────────────┐      ┌────────────────────────┐   │   │
//! │  │   │ JsonFileSequenceStore  │      │ SqliteSequenceStore    │   │   │
//! │  │   │ (file.rs)              │      │ (repository/counter)   │   │   │
//! │  │   │ counter.json           │      │ invoice_counter row    │   │   │
//! │  │   │ temp + rename          │      │ conditional UPDATE     │   │   │
//! │  │   └────────────────────────┘      └───────────┬────────────┘   │   │
//! │  │                                               │                 │   │
//! │  │                                   Database / DbConfig (pool.rs)│   │
//! │  │                                   migrations (embedded)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cuentas_store::{open_store, StoreBackend};
//!
//! let store = open_store(StoreBackend::Json, "/var/lib/cuentas").await?;
//! let next = store.read().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod file;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use file::{JsonFileSequenceStore, COUNTER_FILE};
pub use pool::{Database, DbConfig};
pub use repository::counter::SqliteSequenceStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use cuentas_core::SequenceStore;

/// Database file name under the data directory.
pub const DATABASE_FILE: &str = "cuentas.db";

// =============================================================================
// Backend Selection
// =============================================================================

/// Which durable backend holds the counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// `counter.json` in the data directory.
    #[default]
    Json,

    /// `cuentas.db` in the data directory.
    Sqlite,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Json => f.write_str("json"),
            StoreBackend::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StoreBackend::Json),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("unknown store backend '{other}' (expected json or sqlite)")),
        }
    }
}

/// Opens the configured backend inside `data_dir`.
pub async fn open_store(
    backend: StoreBackend,
    data_dir: impl AsRef<Path>,
) -> DbResult<Arc<dyn SequenceStore>> {
    let data_dir = data_dir.as_ref();
    info!(backend = %backend, dir = %data_dir.display(), "Opening sequence store");

    match backend {
        StoreBackend::Json => Ok(Arc::new(JsonFileSequenceStore::in_dir(data_dir))),
        StoreBackend::Sqlite => {
            std::fs::create_dir_all(data_dir)
                .map_err(|e| DbError::Open(e.to_string()))?;
            let db = Database::new(DbConfig::new(data_dir.join(DATABASE_FILE))).await?;
            Ok(Arc::new(db.counter()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("json".parse::<StoreBackend>().unwrap(), StoreBackend::Json);
        assert_eq!("SQLite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert!("redis".parse::<StoreBackend>().is_err());
        assert_eq!(StoreBackend::default(), StoreBackend::Json);
    }

    #[tokio::test]
    async fn test_backends_share_contract() {
        let dir = tempfile::tempdir().unwrap();

        for backend in [StoreBackend::Json, StoreBackend::Sqlite] {
            let store = open_store(backend, dir.path().join(backend.to_string()))
                .await
                .unwrap();

            assert_eq!(store.read().await.unwrap(), 1);
            store.compare_and_commit(1, 2).await.unwrap();
            assert_eq!(store.read().await.unwrap(), 2);
            assert!(store.compare_and_commit(1, 2).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_sqlite_counter_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = open_store(StoreBackend::Sqlite, dir.path()).await.unwrap();
        store.commit(30).await.unwrap();
        drop(store);

        let reopened = open_store(StoreBackend::Sqlite, dir.path()).await.unwrap();
        assert_eq!(reopened.read().await.unwrap(), 30);
    }
}
