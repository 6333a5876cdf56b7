//! Typed error taxonomy for the history store.
//!
//! Every fallible operation in this crate returns [`StorageError`] instead of
//! a stringly error, so callers can distinguish contention from corruption
//! and react accordingly. Foreign errors (diesel, r2d2, std::io, serde_json)
//! are classified once here via `From` impls.

use thiserror::Error;

/// Unified storage error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend handle is absent: initialization failed or the engine
    /// degraded to an unavailable store after exhausting its retry budget.
    #[error("history store is not initialized")]
    NotInitialized,

    /// File system or generic database I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// A concurrent writer holds the database lock.
    #[error("database is locked by another writer")]
    DatabaseLocked,

    /// The store file failed a structural consistency check.
    #[error("database corrupted: {0}")]
    DatabaseCorrupted(String),

    /// A row could not be decoded into a clipboard entry.
    #[error("invalid row data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Classify a raw SQLite error message.
///
/// SQLite reports both contention and corruption through generic database
/// errors; the message text is the only reliable discriminator diesel
/// exposes for them.
fn classify_message(message: String) -> StorageError {
    let lower = message.to_lowercase();
    if lower.contains("database is locked") || lower.contains("database table is locked") {
        StorageError::DatabaseLocked
    } else if lower.contains("malformed")
        || lower.contains("not a database")
        || lower.contains("corrupt")
    {
        StorageError::DatabaseCorrupted(message)
    } else {
        StorageError::Io(message)
    }
}

impl From<diesel::result::Error> for StorageError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::Error;

        match err {
            Error::DatabaseError(_, info) => classify_message(info.message().to_string()),
            Error::DeserializationError(err) => StorageError::InvalidData(err.to_string()),
            Error::NotFound => StorageError::InvalidData("record not found".to_string()),
            other => StorageError::Io(other.to_string()),
        }
    }
}

impl From<diesel::ConnectionError> for StorageError {
    fn from(err: diesel::ConnectionError) -> Self {
        classify_message(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for StorageError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        StorageError::Io(format!("connection pool error: {}", err))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::InvalidData(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_message_classified_as_locked() {
        let err = classify_message("database is locked".to_string());
        assert!(matches!(err, StorageError::DatabaseLocked));
    }

    #[test]
    fn test_malformed_message_classified_as_corruption() {
        let err = classify_message("database disk image is malformed".to_string());
        assert!(matches!(err, StorageError::DatabaseCorrupted(_)));
    }

    #[test]
    fn test_garbage_file_message_classified_as_corruption() {
        let err = classify_message("file is not a database".to_string());
        assert!(matches!(err, StorageError::DatabaseCorrupted(_)));
    }

    #[test]
    fn test_other_messages_fall_back_to_io() {
        let err = classify_message("disk full".to_string());
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StorageError = io_err.into();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn test_from_serde_json() {
        let json_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }
}
