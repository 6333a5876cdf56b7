//! Public façade over the history store.
//!
//! A `HistoryEngine` is constructed once per process and handed to its
//! consumers by reference; there is no global instance. Construction runs
//! the full initialization sequence — integrity check, recovery if needed,
//! schema and index ensure, one-time legacy migration — and degrades to an
//! unavailable (but never panicking) store when the retry ceiling is
//! exhausted. Steady-state operations are not retried; `DatabaseLocked` and
//! I/O errors surface to the caller unmodified.
//!
//! Calls may block briefly on the SQLite writer lock; UI-thread callers are
//! expected to dispatch onto a background executor themselves.

use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::db::backend::StorageBackend;
use crate::db::dao;
use crate::entry::{ClipboardEntry, EntryId};
use crate::error::{Result, StorageError};
use crate::integrity::{self, StoreHealth};
use crate::legacy::{self, MigrationOutcome};
use crate::recovery::{self, MAX_RECOVERY_ATTEMPTS};

/// Hard ceiling on re-initialization passes. Guarantees termination even if
/// recovery keeps "succeeding" into a state that fails the post-open check.
const MAX_INIT_RETRIES: u32 = 3;

/// Backend handle and recovery budget as one mutex-guarded unit, so racing
/// initializers cannot double-increment the counter or double-recover.
struct EngineState {
    backend: Option<StorageBackend>,
    recovery_attempts: u32,
}

pub struct HistoryEngine {
    state: Mutex<EngineState>,
    db_path: PathBuf,
}

impl HistoryEngine {
    /// Open the engine against the database file at `db_path`.
    ///
    /// Never fails: in the worst case the engine comes up unavailable and
    /// every operation returns [`StorageError::NotInitialized`].
    pub fn open(db_path: impl Into<PathBuf>) -> Self {
        Self::open_with_legacy(db_path, None)
    }

    /// Open the engine and, once the store is ready, import the legacy
    /// flat-file history at `legacy_path` if it is still present.
    pub fn open_with_legacy(db_path: impl Into<PathBuf>, legacy_path: Option<PathBuf>) -> Self {
        let engine = Self {
            state: Mutex::new(EngineState {
                backend: None,
                recovery_attempts: 0,
            }),
            db_path: db_path.into(),
        };
        engine.initialize(legacy_path.as_deref());
        engine
    }

    /// Open the engine at the platform-default location, including the
    /// legacy artifact lookup.
    pub fn open_default() -> Self {
        Self::open_with_legacy(
            crate::fs::history_db_path(),
            Some(crate::fs::legacy_history_path()),
        )
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Current health: a fresh integrity scan when a backend is held,
    /// `Unavailable` otherwise.
    pub fn health(&self) -> StoreHealth {
        if self.state().backend.is_some() {
            integrity::check_store(&self.db_path)
        } else {
            StoreHealth::Unavailable
        }
    }

    /// Upsert an entry by id. All mutable fields are replaced on conflict;
    /// `id` and `captured_at` are immutable.
    pub fn save(&self, entry: &ClipboardEntry) -> Result<()> {
        self.backend()?.with_write(|conn| dao::upsert_entry(conn, entry))
    }

    /// Full history, pinned entries first (newest first), then unpinned
    /// (newest first). Undecodable rows are skipped, never fatal.
    pub fn load_all(&self) -> Result<Vec<ClipboardEntry>> {
        self.backend()?.with_read(dao::load_all)
    }

    /// Fetch a single entry by id.
    pub fn get(&self, id: &EntryId) -> Result<Option<ClipboardEntry>> {
        self.backend()?
            .with_read(|conn| dao::find_entry(conn, id.as_str()))
    }

    /// Delete a single entry by id; returns whether it existed.
    pub fn delete(&self, id: &EntryId) -> Result<bool> {
        self.backend()?
            .with_write(|conn| dao::delete_entry(conn, id.as_str()))
    }

    /// Trim unpinned entries beyond the `keep_max` most recent. Pinned
    /// entries are never evicted. Returns the number of deleted rows.
    pub fn delete_oldest(&self, keep_max: usize) -> Result<usize> {
        self.backend()?
            .with_write(|conn| dao::delete_oldest(conn, keep_max))
    }

    /// Delete all entries, or only unpinned ones when `keep_pinned` is set.
    pub fn clear(&self, keep_pinned: bool) -> Result<usize> {
        self.backend()?.with_write(|conn| dao::clear(conn, keep_pinned))
    }

    /// Total number of stored entries.
    pub fn len(&self) -> Result<usize> {
        let count = self.backend()?.with_read(dao::count_entries)?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Clone the backend handle out of the lock so reads run concurrently
    /// without serializing on the engine mutex.
    fn backend(&self) -> Result<StorageBackend> {
        self.state()
            .backend
            .clone()
            .ok_or(StorageError::NotInitialized)
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        // A poisoned lock only means another thread panicked mid-access;
        // the state itself stays coherent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Full initialization under the state lock: integrity check, bounded
    /// recovery, open, post-open re-check, then one-time legacy migration.
    fn initialize(&self, legacy_path: Option<&Path>) {
        let mut state = self.state();

        for attempt in 1..=MAX_INIT_RETRIES {
            match Self::try_open(&self.db_path, &mut state.recovery_attempts) {
                Ok(backend) => {
                    state.recovery_attempts = 0;
                    if let Some(legacy_path) = legacy_path {
                        Self::run_legacy_migration(&backend, legacy_path);
                    }
                    state.backend = Some(backend);
                    return;
                }
                Err(err) => warn!(
                    "history store open attempt {}/{} failed: {}",
                    attempt, MAX_INIT_RETRIES, err
                ),
            }
        }

        error!(
            "history store at {} is unavailable after {} attempts; \
             operations will fail until restart",
            self.db_path.display(),
            MAX_INIT_RETRIES
        );
        state.backend = None;
    }

    fn try_open(path: &Path, recovery_attempts: &mut u32) -> Result<StorageBackend> {
        if path.exists() {
            if let StoreHealth::Corrupted(reason) = integrity::check_store(path) {
                warn!(
                    "history store at {} failed integrity check: {}",
                    path.display(),
                    reason
                );
                if *recovery_attempts >= MAX_RECOVERY_ATTEMPTS {
                    warn!("recovery budget exhausted; resetting to an empty store");
                    recovery::reset_store(path)?;
                } else {
                    *recovery_attempts += 1;
                    let summary = recovery::recover(path)?;
                    info!(
                        "recovered history store at {}: {} salvaged, {} discarded, backup {:?}",
                        path.display(),
                        summary.salvaged,
                        summary.discarded,
                        summary.backup_path
                    );
                }
            }
        }

        let backend = StorageBackend::open(path)?;

        // Re-check right after opening: the file may have changed between
        // the pre-open scan and the pool taking ownership.
        if let StoreHealth::Corrupted(reason) = integrity::check_store(path) {
            return Err(StorageError::DatabaseCorrupted(reason));
        }

        Ok(backend)
    }

    fn run_legacy_migration(backend: &StorageBackend, legacy_path: &Path) {
        match legacy::migrate(backend, legacy_path) {
            Ok(MigrationOutcome::Migrated { imported, skipped }) => info!(
                "imported {} legacy history entr(ies) from {} ({} skipped)",
                imported,
                legacy_path.display(),
                skipped
            ),
            Ok(MigrationOutcome::NothingToMigrate) => {}
            Ok(MigrationOutcome::LeftInPlace) => warn!(
                "legacy history at {} could not be decoded; left in place for inspection",
                legacy_path.display()
            ),
            Err(err) => warn!(
                "legacy history migration from {} failed: {}",
                legacy_path.display(),
                err
            ),
        }
    }
}
