//! Structural consistency checks for the store file.
//!
//! `PRAGMA integrity_check` on a throwaway connection certifies an existing
//! file before the backend is trusted, and again right after opening for
//! normal use (the file may have changed between checks). Anything other
//! than a single `ok` row is treated as corruption, fatal or not.

use diesel::sqlite::SqliteConnection;
use diesel::{Connection, RunQueryDsl};
use log::debug;
use std::path::Path;

/// Derived health of the store; computed fresh on each open attempt and
/// never cached across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreHealth {
    Healthy,
    Corrupted(String),
    Unavailable,
}

impl StoreHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, StoreHealth::Healthy)
    }
}

#[derive(diesel::QueryableByName)]
struct IntegrityCheckRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    integrity_check: String,
}

#[derive(diesel::QueryableByName)]
struct QuickCheckRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    quick_check: String,
}

/// Full structural consistency scan of the file at `path`.
///
/// Uses a throwaway connection; the table data is never mutated. Failure to
/// open or to run the pragma counts as corruption, since either way the file
/// cannot be trusted.
pub fn check_store(path: &Path) -> StoreHealth {
    let mut conn = match SqliteConnection::establish(&path.to_string_lossy()) {
        Ok(conn) => conn,
        Err(err) => return StoreHealth::Corrupted(format!("cannot open store: {}", err)),
    };

    match diesel::sql_query("PRAGMA integrity_check").load::<IntegrityCheckRow>(&mut conn) {
        Ok(rows) => {
            if rows.len() == 1 && rows[0].integrity_check == "ok" {
                debug!("integrity check passed for {}", path.display());
                StoreHealth::Healthy
            } else {
                let detail = rows
                    .iter()
                    .map(|r| r.integrity_check.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                StoreHealth::Corrupted(detail)
            }
        }
        Err(err) => StoreHealth::Corrupted(err.to_string()),
    }
}

/// Fast readability probe used during salvage to choose between a bulk read
/// and row-by-row iteration. A passing quick check is a hint, not a proof;
/// salvage validates every row either way.
pub fn quick_check(conn: &mut SqliteConnection) -> bool {
    diesel::sql_query("PRAGMA quick_check")
        .load::<QuickCheckRow>(conn)
        .map(|rows| rows.len() == 1 && rows[0].quick_check == "ok")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::backend::StorageBackend;

    #[test]
    fn test_fresh_store_is_healthy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.sqlite3");
        StorageBackend::open(&path).expect("open");

        assert_eq!(check_store(&path), StoreHealth::Healthy);
    }

    #[test]
    fn test_garbage_file_is_corrupted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.sqlite3");
        std::fs::write(&path, b"definitely not a sqlite database").expect("write garbage");

        assert!(matches!(check_store(&path), StoreHealth::Corrupted(_)));
    }

    #[test]
    fn test_quick_check_passes_on_healthy_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.sqlite3");
        StorageBackend::open(&path).expect("open");

        let mut conn =
            SqliteConnection::establish(&path.to_string_lossy()).expect("throwaway conn");
        assert!(quick_check(&mut conn));
    }
}
