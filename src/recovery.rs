//! Corruption recovery: backup, salvage, rebuild.
//!
//! Converts a corrupted store file into a fresh working one while keeping as
//! many rows as can still be read. Every step past the reset is best-effort
//! at row granularity; a row that cannot be salvaged or re-inserted is logged
//! and dropped, never fatal. The attempt budget lives in the engine's state
//! struct so concurrent initializers cannot double-recover the same file.

use chrono::Utc;
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::db::backend::StorageBackend;
use crate::db::{dao, models::ClipboardEntryRow};
use crate::entry::ClipboardEntry;
use crate::error::Result;
use crate::integrity;

/// How many salvage-and-rebuild passes a single engine will attempt before
/// giving up and resetting to an empty store.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Outcome of one recovery pass, for post-mortem logging.
#[derive(Debug)]
pub struct RecoverySummary {
    /// Rows re-inserted into the rebuilt store.
    pub salvaged: usize,
    /// Rows that failed to read, decode, or re-insert.
    pub discarded: usize,
    /// Where the corrupted file was copied, when the backup succeeded.
    pub backup_path: Option<PathBuf>,
}

/// Salvage what can be read from the corrupted store at `path`, then replace
/// it with a freshly built one containing the salvaged rows.
pub fn recover(path: &Path) -> Result<RecoverySummary> {
    let backup_path = backup_corrupted_file(path);

    let (entries, unreadable) = salvage_entries(path);
    info!(
        "salvaged {} row(s) from corrupted store {} ({} unreadable)",
        entries.len(),
        path.display(),
        unreadable
    );

    reset_store(path)?;
    let backend = StorageBackend::open(path)?;

    let mut salvaged = 0usize;
    let mut dropped = 0usize;
    backend.with_write(|conn| {
        for entry in &entries {
            match dao::upsert_entry(conn, entry) {
                Ok(()) => salvaged += 1,
                Err(err) => {
                    warn!("could not restore salvaged row {}: {}", entry.id, err);
                    dropped += 1;
                }
            }
        }
        Ok(())
    })?;

    Ok(RecoverySummary {
        salvaged,
        discarded: unreadable + dropped,
        backup_path,
    })
}

/// Delete the store file and its WAL/SHM siblings so a rebuild starts clean.
/// A stale journal must not survive the reset or it could resurrect
/// corrupted pages into the fresh file.
pub fn reset_store(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    for suffix in ["-wal", "-shm"] {
        let sibling = sibling_path(path, suffix);
        if sibling.exists() {
            if let Err(err) = std::fs::remove_file(&sibling) {
                warn!("could not remove {}: {}", sibling.display(), err);
            }
        }
    }
    info!("reset history store at {}", path.display());
    Ok(())
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// Copy the corrupted file aside for post-mortem inspection. Best-effort: a
/// failed backup is logged and recovery proceeds without it.
fn backup_corrupted_file(path: &Path) -> Option<PathBuf> {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "history".to_string());
    let backup = path.with_file_name(format!("{}.corrupt-{}.bak", file_name, stamp));

    match std::fs::copy(path, &backup) {
        Ok(_) => {
            info!("backed up corrupted store to {}", backup.display());
            Some(backup)
        }
        Err(err) => {
            warn!("could not back up corrupted store {}: {}", path.display(), err);
            None
        }
    }
}

/// Read whatever rows can still be decoded from the corrupted file.
///
/// A passing quick check selects the cheap bulk read; otherwise (or when the
/// bulk read itself fails) rows are fetched one id at a time. Both paths run
/// every row through the same domain decode, so a passing quick check is
/// never taken as proof that the rows are valid.
fn salvage_entries(path: &Path) -> (Vec<ClipboardEntry>, usize) {
    let mut conn = match SqliteConnection::establish(&path.to_string_lossy()) {
        Ok(conn) => conn,
        Err(err) => {
            warn!("corrupted store is unreadable, nothing to salvage: {}", err);
            return (Vec::new(), 0);
        }
    };

    if integrity::quick_check(&mut conn) {
        match dao::load_rows(&mut conn) {
            Ok(rows) => return decode_rows(rows),
            Err(err) => warn!("bulk salvage read failed, retrying row-by-row: {}", err),
        }
    }

    salvage_row_by_row(&mut conn)
}

fn decode_rows(rows: Vec<ClipboardEntryRow>) -> (Vec<ClipboardEntry>, usize) {
    let mut entries = Vec::with_capacity(rows.len());
    let mut discarded = 0usize;
    for row in rows {
        let id = row.id.clone();
        match ClipboardEntry::try_from(row) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                warn!("discarding unsalvageable row {}: {}", id, err);
                discarded += 1;
            }
        }
    }
    (entries, discarded)
}

fn salvage_row_by_row(conn: &mut SqliteConnection) -> (Vec<ClipboardEntry>, usize) {
    let ids = match dao::list_ids(conn) {
        Ok(ids) => ids,
        Err(err) => {
            warn!("cannot enumerate rows in corrupted store: {}", err);
            return (Vec::new(), 0);
        }
    };

    let mut entries = Vec::new();
    let mut discarded = 0usize;
    for id in ids {
        match dao::find_row(conn, &id) {
            Ok(Some(row)) => match ClipboardEntry::try_from(row) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!("discarding unsalvageable row {}: {}", id, err);
                    discarded += 1;
                }
            },
            Ok(None) => discarded += 1,
            Err(err) => {
                warn!("row {} unreadable during salvage: {}", id, err);
                discarded += 1;
            }
        }
    }
    (entries, discarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryId;
    use diesel::RunQueryDsl;

    fn seeded_store(path: &Path, n: usize) -> StorageBackend {
        let backend = StorageBackend::open(path).expect("open");
        backend
            .with_write(|conn| {
                for i in 0..n {
                    let entry = ClipboardEntry::new(
                        EntryId::from(format!("e{}", i).as_str()),
                        format!("preview {}", i),
                        i as i64 * 100,
                    );
                    dao::upsert_entry(conn, &entry)?;
                }
                Ok(())
            })
            .expect("seed");
        backend
    }

    #[test]
    fn test_recover_salvages_all_valid_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.sqlite3");
        drop(seeded_store(&path, 4));

        let summary = recover(&path).expect("recover");
        assert_eq!(summary.salvaged, 4);
        assert_eq!(summary.discarded, 0);
        let backup = summary.backup_path.expect("backup created");
        assert!(backup.exists());

        let backend = StorageBackend::open(&path).expect("reopen");
        let count = backend.with_read(|conn| dao::count_entries(conn)).expect("count");
        assert_eq!(count, 4);
    }

    #[test]
    fn test_recover_garbage_file_yields_empty_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.sqlite3");
        std::fs::write(&path, b"garbage bytes, not sqlite").expect("write garbage");

        let summary = recover(&path).expect("recover");
        assert_eq!(summary.salvaged, 0);

        assert!(integrity::check_store(&path).is_healthy());
    }

    #[test]
    fn test_recover_discards_rows_failing_validation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.sqlite3");
        let backend = seeded_store(&path, 2);
        backend
            .with_write(|conn| {
                diesel::sql_query(
                    "INSERT INTO clipboard_entries \
                     (id, preview_text, captured_at, is_pinned, is_sensitive) \
                     VALUES ('broken', '', 999, 0, 0)",
                )
                .execute(conn)?;
                Ok(())
            })
            .expect("inject invalid row");
        drop(backend);

        let summary = recover(&path).expect("recover");
        assert_eq!(summary.salvaged, 2);
        assert_eq!(summary.discarded, 1);
    }

    #[test]
    fn test_reset_store_removes_journal_siblings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.sqlite3");
        std::fs::write(&path, b"x").expect("db");
        std::fs::write(sibling_path(&path, "-wal"), b"x").expect("wal");
        std::fs::write(sibling_path(&path, "-shm"), b"x").expect("shm");

        reset_store(&path).expect("reset");
        assert!(!path.exists());
        assert!(!sibling_path(&path, "-wal").exists());
        assert!(!sibling_path(&path, "-shm").exists());
    }
}
