//! # JSON Counter File
//!
//! The counter as a `{"counter": N}` record on disk, replaced atomically.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compare_and_commit(N, N+1)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock counter.json.lock (exclusive, OS level)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  re-read counter.json ── found != N ──► Conflict                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write .counter.json.<uuid>.tmp  ──► sync_all                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  rename(tmp, counter.json)  ← readers see old or new, never partial     │
//! │       │                                                                 │
//! │       └── any failure → tmp removed, counter.json untouched            │
//! │                                                                         │
//! │  unlock (lock file handle closed)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock file is held through `fs4`, so it excludes other store instances
//! over the same path and other server processes, not just other tasks. The
//! in-process mutex keeps tasks of one instance from each parking a blocking
//! thread on the OS lock.

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use cuentas_core::sequence::{check_commit_value, normalize_counter};
use cuentas_core::error::StoreResult;
use cuentas_core::{SequenceStore, StoreError};

/// Default file name under the data directory.
pub const COUNTER_FILE: &str = "counter.json";

/// On-disk record.
#[derive(Debug, Serialize, Deserialize)]
struct CounterRecord {
    counter: u64,
}

/// Sequence Store persisted as a JSON file.
#[derive(Debug)]
pub struct JsonFileSequenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSequenceStore {
    /// Store at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileSequenceStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `<dir>/counter.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(COUNTER_FILE))
    }

    /// Path of the counter file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the commit lock is taken on.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_file_name(format!("{}.lock", self.file_name()))
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| COUNTER_FILE.to_string())
    }

    async fn ensure_parent(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Takes the exclusive lock on [`lock_path`](Self::lock_path), waiting
    /// for any other holder.
    async fn lock_exclusive(&self) -> StoreResult<CommitLock> {
        self.ensure_parent().await?;
        let path = self.lock_path();
        let lock = tokio::task::spawn_blocking(move || CommitLock::acquire(&path))
            .await
            .map_err(std::io::Error::other)??;
        Ok(lock)
    }

    async fn load(&self) -> StoreResult<Option<u64>> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let record: CounterRecord = serde_json::from_str(&text).map_err(|e| {
            StoreError::Corrupt(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(Some(record.counter))
    }

    async fn write_atomic(&self, next: u64) -> StoreResult<()> {
        let body = serde_json::to_vec(&CounterRecord { counter: next })
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        self.ensure_parent().await?;

        let temp = self.temp_path();
        if let Err(e) = write_and_sync(&temp, &body).await {
            discard(&temp).await;
            return Err(StoreError::Io(e));
        }
        if let Err(e) = fs::rename(&temp, &self.path).await {
            discard(&temp).await;
            return Err(StoreError::Io(e));
        }

        debug!(path = %self.path.display(), counter = next, "Counter file replaced");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_file_name(format!(
            ".{}.{}.tmp",
            self.file_name(),
            Uuid::new_v4().simple()
        ))
    }
}

/// Held OS lock on the lock file. Closing the handle releases it.
#[derive(Debug)]
struct CommitLock {
    _file: std::fs::File,
}

impl CommitLock {
    fn acquire(path: &Path) -> std::io::Result<CommitLock> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(CommitLock { _file: file })
    }
}

async fn write_and_sync(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(body).await?;
    file.sync_all().await
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Could not remove temp counter file");
        }
    }
}

#[async_trait]
impl SequenceStore for JsonFileSequenceStore {
    async fn read(&self) -> StoreResult<u64> {
        Ok(normalize_counter(self.load().await?))
    }

    async fn commit(&self, next: u64) -> StoreResult<()> {
        check_commit_value(next)?;
        let _guard = self.write_lock.lock().await;
        let _lock = self.lock_exclusive().await?;
        self.write_atomic(next).await
    }

    async fn compare_and_commit(&self, expected: u64, next: u64) -> StoreResult<()> {
        check_commit_value(next)?;
        let _guard = self.write_lock.lock().await;
        let _lock = self.lock_exclusive().await?;

        let found = normalize_counter(self.load().await?);
        if found != expected {
            debug!(path = %self.path.display(), expected, found, "Counter moved under us");
            return Err(StoreError::Conflict { expected, found });
        }
        self.write_atomic(next).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::Arc;

    fn sorted_entries(dir: &Path) -> Vec<OsString> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        entries.sort();
        entries
    }

    #[tokio::test]
    async fn test_absent_file_reads_initial_without_creating() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSequenceStore::in_dir(dir.path());

        assert_eq!(store.read().await.unwrap(), 1);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_commit_round_trip_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSequenceStore::in_dir(dir.path());

        store.commit(8).await.unwrap();
        assert_eq!(store.read().await.unwrap(), 8);

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, r#"{"counter":8}"#);
    }

    #[tokio::test]
    async fn test_existing_source_format_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COUNTER_FILE);
        std::fs::write(&path, "{\n  \"counter\": 23\n}").unwrap();

        let store = JsonFileSequenceStore::new(&path);
        assert_eq!(store.read().await.unwrap(), 23);
    }

    #[tokio::test]
    async fn test_zero_reads_as_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COUNTER_FILE);
        std::fs::write(&path, r#"{"counter":0}"#).unwrap();

        let store = JsonFileSequenceStore::new(&path);
        assert_eq!(store.read().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COUNTER_FILE);
        std::fs::write(&path, "{\"counter\": \"seven\"").unwrap();

        let store = JsonFileSequenceStore::new(&path);
        assert!(matches!(store.read().await, Err(StoreError::Corrupt(_))));
        assert!(matches!(
            store.compare_and_commit(1, 2).await,
            Err(StoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_creates_parent_dir_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSequenceStore::new(dir.path().join("data").join(COUNTER_FILE));

        store.commit(2).await.unwrap();
        store.commit(3).await.unwrap();

        assert_eq!(
            sorted_entries(&dir.path().join("data")),
            vec![OsString::from(COUNTER_FILE), OsString::from("counter.json.lock")]
        );
    }

    #[tokio::test]
    async fn test_compare_and_commit_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COUNTER_FILE);
        let a = JsonFileSequenceStore::new(&path);
        let b = JsonFileSequenceStore::new(&path);

        let seen_a = a.read().await.unwrap();
        let seen_b = b.read().await.unwrap();

        a.compare_and_commit(seen_a, seen_a + 1).await.unwrap();
        let err = b.compare_and_commit(seen_b, seen_b + 1).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 1,
                found: 2
            }
        ));
        assert_eq!(b.read().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be: rename over it fails.
        let path = dir.path().join(COUNTER_FILE);
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let store = JsonFileSequenceStore::new(&path);
        assert!(matches!(store.commit(2).await, Err(StoreError::Io(_))));

        assert_eq!(
            sorted_entries(dir.path()),
            vec![OsString::from(COUNTER_FILE), OsString::from("counter.json.lock")]
        );
    }

    #[test]
    fn test_lock_path_is_a_sibling() {
        let store = JsonFileSequenceStore::new("/srv/cuentas/numero.json");
        assert_eq!(store.lock_path(), PathBuf::from("/srv/cuentas/numero.json.lock"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_instances_have_exactly_one_winner() {
        for round in 0..25 {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(COUNTER_FILE);

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let store = JsonFileSequenceStore::new(&path);
                    tokio::spawn(async move { store.compare_and_commit(1, 2).await })
                })
                .collect();

            let mut winners = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(()) => winners += 1,
                    Err(StoreError::Conflict { expected: 1, found: 2 }) => {}
                    Err(other) => panic!("round {round}: unexpected {other:?}"),
                }
            }
            assert_eq!(winners, 1, "round {round}");
            assert_eq!(JsonFileSequenceStore::new(&path).read().await.unwrap(), 2);
        }
    }

    /// Renderer that holds every number long enough for issuers to overlap.
    struct PausingRenderer;

    #[async_trait]
    impl cuentas_core::DocumentRenderer for PausingRenderer {
        async fn render(
            &self,
            fields: &cuentas_core::InvoiceFields,
        ) -> cuentas_core::error::RenderResult<Vec<u8>> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(fields.numero.clone().into_bytes())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_services_over_one_counter_file_issue_distinct_numbers() {
        use cuentas_core::{Currency, InvoiceRequest, InvoiceService, PresetPrice, PriceSelection};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COUNTER_FILE);
        let issuer = || {
            InvoiceService::new(
                Arc::new(JsonFileSequenceStore::new(&path)),
                Arc::new(PausingRenderer),
            )
        };
        let (first, second) = (issuer(), issuer());

        let request = |client: &str| InvoiceRequest {
            razon_social: client.to_string(),
            nit: "900.123.456-7".to_string(),
            servicio: "Soporte".to_string(),
            precio: PriceSelection::Preset(PresetPrice::lookup("625").unwrap()),
            moneda: Currency::Usd,
        };
        let (uno, dos) = (request("Uno"), request("Dos"));

        let (a, b) = tokio::join!(first.generate(&uno), second.generate(&dos));

        let mut numbers = vec![a.unwrap().numero.value(), b.unwrap().numero.value()];
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(JsonFileSequenceStore::new(&path).read().await.unwrap(), 3);
    }
}
