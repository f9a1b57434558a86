//! # Sequence Store Contract
//!
//! The invoice counter: the only state that outlives a request.
//!
//! ## Read / Commit Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Counter Lifecycle                                    │
//! │                                                                         │
//! │  nothing persisted ──► read() = 1   (not written yet)                  │
//! │                                                                         │
//! │  read() = N ──► render OK ──► compare_and_commit(N, N+1)               │
//! │       │                            │                                    │
//! │       │                            ├── stored == N → stored = N+1      │
//! │       │                            └── stored != N → Conflict          │
//! │       │                                                                 │
//! │       └──► render FAILED ──► (no commit) next read() = N again         │
//! │                                                                         │
//! │  A number is "issued" only once its commit has run.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backends live in `cuentas-store`; [`MemorySequenceStore`] is the in-process
//! fake used by tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::{INITIAL_COUNTER, NUMERO_MIN_WIDTH};

// =============================================================================
// Trait
// =============================================================================

/// Durable owner of the invoice counter.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Current counter value, without side effects.
    ///
    /// Returns [`INITIAL_COUNTER`] when nothing (or `0`) is persisted.
    async fn read(&self) -> StoreResult<u64>;

    /// Overwrites the persisted value with `next`.
    ///
    /// Must be atomic with respect to a full overwrite: a reader sees either
    /// the old or the new value, never a partial record.
    async fn commit(&self, next: u64) -> StoreResult<()>;

    /// Commits `next` only if the persisted value is still `expected`.
    ///
    /// ## Returns
    /// * `Ok(())` - the counter moved from `expected` to `next`
    /// * `Err(StoreError::Conflict)` - someone else committed first
    async fn compare_and_commit(&self, expected: u64, next: u64) -> StoreResult<()>;
}

/// Normalizes a persisted value: `0` and absent both mean "start at 1".
pub fn normalize_counter(stored: Option<u64>) -> u64 {
    match stored {
        None | Some(0) => INITIAL_COUNTER,
        Some(n) => n,
    }
}

/// Rejects values a commit must never write.
pub fn check_commit_value(next: u64) -> StoreResult<()> {
    if next < INITIAL_COUNTER {
        return Err(StoreError::InvalidValue(next));
    }
    Ok(())
}

// =============================================================================
// Display Number
// =============================================================================

/// Renders a counter value for display and filenames.
///
/// ## Rules
/// - Minimum 3 digits, left zero padded
/// - Wider values keep their natural width (never truncated)
///
/// ## Example
/// ```rust
/// use cuentas_core::sequence::format_numero;
///
/// assert_eq!(format_numero(7), "007");
/// assert_eq!(format_numero(1200), "1200");
/// ```
pub fn format_numero(value: u64) -> String {
    format!("{:0width$}", value, width = NUMERO_MIN_WIDTH)
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Sequence Store kept in memory.
///
/// Failure switches let tests drive the error paths of the orchestrator.
#[derive(Debug, Default)]
pub struct MemorySequenceStore {
    value: Mutex<Option<u64>>,
    fail_reads: AtomicBool,
    fail_commits: AtomicBool,
    commits: AtomicUsize,
}

impl MemorySequenceStore {
    /// Empty store: first read returns 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `value`.
    pub fn starting_at(value: u64) -> Self {
        MemorySequenceStore {
            value: Mutex::new(Some(value)),
            ..Self::default()
        }
    }

    /// Makes every subsequent `read` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent commit fail.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Raw persisted value, `None` if never committed.
    pub async fn stored(&self) -> Option<u64> {
        *self.value.lock().await
    }

    fn injected(&self, flag: &AtomicBool, op: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other(format!(
                "injected {op} failure"
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl SequenceStore for MemorySequenceStore {
    async fn read(&self) -> StoreResult<u64> {
        self.injected(&self.fail_reads, "read")?;
        Ok(normalize_counter(*self.value.lock().await))
    }

    async fn commit(&self, next: u64) -> StoreResult<()> {
        self.injected(&self.fail_commits, "commit")?;
        check_commit_value(next)?;
        *self.value.lock().await = Some(next);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn compare_and_commit(&self, expected: u64, next: u64) -> StoreResult<()> {
        self.injected(&self.fail_commits, "commit")?;
        check_commit_value(next)?;
        let mut value = self.value.lock().await;
        let found = normalize_counter(*value);
        if found != expected {
            return Err(StoreError::Conflict { expected, found });
        }
        *value = Some(next);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
