//! One-shot import of the legacy flat-file history format.
//!
//! Earlier versions persisted the history as a JSON array in the application
//! data directory. The artifact is consumed exactly once: a successful
//! import removes it, so a second run finds nothing to migrate. An artifact
//! that fails to decode is left in place for manual inspection.

use log::{info, warn};
use serde::Deserialize;
use std::path::Path;

use crate::db::backend::StorageBackend;
use crate::db::dao;
use crate::entry::{ClipboardEntry, EntryId};
use crate::error::Result;

/// Legacy record shape (camelCase keys, as written by the old persistence
/// layer). Unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyEntry {
    id: String,
    preview_text: String,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    rich_payload_refs: Vec<String>,
    captured_at: i64,
    #[serde(default)]
    is_pinned: bool,
    #[serde(default)]
    is_sensitive: bool,
}

impl LegacyEntry {
    fn into_entry(self) -> ClipboardEntry {
        ClipboardEntry {
            id: EntryId::new(self.id),
            preview_text: self.preview_text,
            full_text: self.full_text,
            rich_payload_refs: self.rich_payload_refs,
            captured_at_ms: self.captured_at,
            is_pinned: self.is_pinned,
            is_sensitive: self.is_sensitive,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The artifact was imported and removed.
    Migrated { imported: usize, skipped: usize },
    /// No artifact, or an empty one; nothing was touched.
    NothingToMigrate,
    /// The artifact exists but could not be decoded; it was left in place.
    LeftInPlace,
}

/// Import the legacy artifact at `artifact` into the store, removing it on
/// success. Idempotent by construction.
pub fn migrate(backend: &StorageBackend, artifact: &Path) -> Result<MigrationOutcome> {
    let raw = match std::fs::read_to_string(artifact) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(MigrationOutcome::NothingToMigrate);
        }
        Err(err) => return Err(err.into()),
    };

    if raw.trim().is_empty() {
        return Ok(MigrationOutcome::NothingToMigrate);
    }

    let legacy: Vec<LegacyEntry> = match serde_json::from_str(&raw) {
        Ok(legacy) => legacy,
        Err(err) => {
            warn!(
                "legacy history at {} is undecodable: {}",
                artifact.display(),
                err
            );
            return Ok(MigrationOutcome::LeftInPlace);
        }
    };

    if legacy.is_empty() {
        return Ok(MigrationOutcome::NothingToMigrate);
    }

    let mut imported = 0usize;
    let mut skipped = 0usize;
    backend.with_write(|conn| {
        for item in legacy {
            let entry = item.into_entry();
            match dao::upsert_entry(conn, &entry) {
                Ok(()) => imported += 1,
                Err(err) => {
                    warn!("skipping legacy entry {}: {}", entry.id, err);
                    skipped += 1;
                }
            }
        }
        Ok(())
    })?;

    std::fs::remove_file(artifact)?;
    info!(
        "legacy history artifact {} imported and removed",
        artifact.display()
    );

    Ok(MigrationOutcome::Migrated { imported, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_in(dir: &Path) -> StorageBackend {
        StorageBackend::open(&dir.join("history.sqlite3")).expect("open")
    }

    #[test]
    fn test_absent_artifact_is_nothing_to_migrate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = backend_in(dir.path());

        let outcome = migrate(&backend, &dir.path().join("history.json")).expect("migrate");
        assert_eq!(outcome, MigrationOutcome::NothingToMigrate);
    }

    #[test]
    fn test_import_then_second_run_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = backend_in(dir.path());
        let artifact = dir.path().join("history.json");
        std::fs::write(
            &artifact,
            r#"[{"id":"a","previewText":"hello","capturedAt":100,"isPinned":true},
               {"id":"b","previewText":"world","capturedAt":200}]"#,
        )
        .expect("write artifact");

        let outcome = migrate(&backend, &artifact).expect("migrate");
        assert_eq!(
            outcome,
            MigrationOutcome::Migrated {
                imported: 2,
                skipped: 0
            }
        );
        assert!(!artifact.exists());

        let count = backend
            .with_read(|conn| dao::count_entries(conn))
            .expect("count");
        assert_eq!(count, 2);

        let outcome = migrate(&backend, &artifact).expect("second run");
        assert_eq!(outcome, MigrationOutcome::NothingToMigrate);
        let count = backend
            .with_read(|conn| dao::count_entries(conn))
            .expect("count");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_undecodable_artifact_is_left_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = backend_in(dir.path());
        let artifact = dir.path().join("history.json");
        std::fs::write(&artifact, "{ this is not json").expect("write artifact");

        let outcome = migrate(&backend, &artifact).expect("migrate");
        assert_eq!(outcome, MigrationOutcome::LeftInPlace);
        assert!(artifact.exists());
    }

    #[test]
    fn test_empty_artifact_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = backend_in(dir.path());
        let artifact = dir.path().join("history.json");
        std::fs::write(&artifact, "[]").expect("write artifact");

        let outcome = migrate(&backend, &artifact).expect("migrate");
        assert_eq!(outcome, MigrationOutcome::NothingToMigrate);
        assert!(artifact.exists());
    }
}
