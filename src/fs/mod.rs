//! Platform data directory resolution for the history store.
//!
//! - macOS: ~/Library/Application Support/ClipKeeper
//! - Windows: %APPDATA%\ClipKeeper
//! - Linux: $XDG_DATA_HOME/ClipKeeper or ~/.local/share/ClipKeeper
//!
//! When the platform data directory cannot be resolved the home directory is
//! used, and failing that the system temp directory, so the engine always has
//! a writable base to fall back to.
//!
//! These functions do not create directories; `StorageBackend::open` creates
//! what it needs.

use std::path::PathBuf;

const APP_DIR_NAME: &str = "ClipKeeper";
const HISTORY_DB_FILE: &str = "history.sqlite3";
const LEGACY_HISTORY_FILE: &str = "history.json";

/// Application data root directory, with fallback chain.
pub fn app_data_dir() -> PathBuf {
    if let Some(base) = dirs::data_dir() {
        return base.join(APP_DIR_NAME);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("share").join(APP_DIR_NAME);
    }
    std::env::temp_dir().join(APP_DIR_NAME)
}

/// Directory holding the database file.
pub fn db_dir() -> PathBuf {
    app_data_dir().join("db")
}

/// Well-known location of the history database file.
pub fn history_db_path() -> PathBuf {
    db_dir().join(HISTORY_DB_FILE)
}

/// Well-known location of the legacy flat-file history artifact.
pub fn legacy_history_path() -> PathBuf {
    app_data_dir().join(LEGACY_HISTORY_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_DIR_NAME));
    }

    #[test]
    fn test_derived_paths() {
        let db_path = history_db_path();
        assert!(db_path.ends_with("db/history.sqlite3"));
        assert!(db_path.components().any(|c| c.as_os_str() == APP_DIR_NAME));

        let legacy = legacy_history_path();
        assert!(legacy.ends_with(LEGACY_HISTORY_FILE));
    }
}
