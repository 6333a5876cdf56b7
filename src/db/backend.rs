//! Storage backend: owns the on-disk database file and connection lifecycle.
//!
//! The backend hands out scoped transactional execution through
//! [`StorageBackend::with_read`] / [`StorageBackend::with_write`]; all
//! mutations go through the write scope, so a whole operation commits or
//! rolls back as one unit. Schema objects are created idempotently on every
//! open (`CREATE TABLE IF NOT EXISTS` migrations plus `ensure_indexes`), so
//! reopening after recovery or on an older installation is safe.

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

/// Embed all diesel migrations at compile time.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Per-connection settings applied on every acquire.
///
/// WAL keeps readers unblocked by the single writer; the busy timeout makes
/// writer contention surface as a bounded wait instead of an immediate
/// `SQLITE_BUSY`.
#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA busy_timeout = 5000; \
             PRAGMA foreign_keys = ON;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Handle to the single on-disk history database.
#[derive(Clone)]
pub struct StorageBackend {
    pool: DbPool,
    path: PathBuf,
}

impl StorageBackend {
    /// Open (or create) the database file at `path` and bring the schema up
    /// to date. Safe to call repeatedly; no duplicate schema objects result.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let database_url = path.to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .connection_customizer(Box::new(ConnectionOptions))
            .build(manager)?;

        let backend = Self {
            pool,
            path: path.to_path_buf(),
        };
        backend.run_migrations()?;
        backend.ensure_indexes()?;

        debug!("history store opened at {}", path.display());
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run all pending embedded migrations.
    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.get()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StorageError::Io(format!("migration failed: {}", e)))?;
        if !applied.is_empty() {
            info!("applied {} database migration(s)", applied.len());
        }
        Ok(())
    }

    /// Idempotent index-presence check, callable after any reopen.
    ///
    /// Covers installations whose schema predates the index migrations.
    pub fn ensure_indexes(&self) -> Result<()> {
        let mut conn = self.pool.get()?;
        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_clipboard_entries_recency \
             ON clipboard_entries (captured_at DESC)",
        )
        .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_clipboard_entries_pinned \
             ON clipboard_entries (is_pinned)",
        )
        .execute(&mut conn)?;
        Ok(())
    }

    /// Run `f` inside a write transaction. The transaction takes the writer
    /// lock up front (`BEGIN IMMEDIATE`), so no partial mutation is ever
    /// observable by readers.
    pub fn with_write<T>(
        &self,
        f: impl FnOnce(&mut SqliteConnection) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.pool.get()?;
        conn.immediate_transaction(|conn| f(conn))
    }

    /// Run `f` inside a read transaction; observes a consistent snapshot of
    /// all writes committed before the transaction began.
    pub fn with_read<T>(&self, f: impl FnOnce(&mut SqliteConnection) -> Result<T>) -> Result<T> {
        use diesel::Connection;

        let mut conn = self.pool.get()?;
        conn.transaction(|conn| f(conn))
    }
}
