//! Clipboard history persistence engine.
//!
//! Durably stores an ordered, bounded collection of clipboard snapshots in a
//! single SQLite file, detects and recovers from storage corruption, and
//! guarantees consistent reads and writes under concurrent access from a UI
//! thread and a background capture process.
//!
//! The public surface is [`HistoryEngine`]: construct it once at startup and
//! pass it to the capture producer (which calls [`HistoryEngine::save`]) and
//! the UI consumer (which calls [`HistoryEngine::load_all`],
//! [`HistoryEngine::delete_oldest`] and [`HistoryEngine::clear`]).
//! Initialization is self-healing: a corrupted store file is backed up,
//! salvaged row by row, and rebuilt, bounded by a fixed retry budget; when
//! the budget is exhausted the engine degrades to an empty or unavailable
//! store instead of failing the process.

pub mod db;
pub mod engine;
pub mod entry;
pub mod error;
pub mod fs;
pub mod integrity;
pub mod legacy;
pub mod recovery;

pub use engine::HistoryEngine;
pub use entry::{ClipboardEntry, EntryId};
pub use error::{Result, StorageError};
pub use integrity::StoreHealth;
pub use legacy::MigrationOutcome;
pub use recovery::RecoverySummary;
