//! Data access operations over the `clipboard_entries` table.
//!
//! Free functions over `&mut SqliteConnection`; callers supply the
//! transactional scope through `StorageBackend::with_read`/`with_write`.

use diesel::prelude::*;
use diesel::upsert::excluded;
use log::warn;

use crate::db::models::{ClipboardEntryRow, NewClipboardEntryRow};
use crate::db::schema::clipboard_entries::dsl;
use crate::entry::ClipboardEntry;
use crate::error::Result;

/// Insert-or-update an entry keyed by id.
///
/// On conflict every mutable field is replaced; `id` and `captured_at` keep
/// their original values, so re-saving is idempotent.
pub fn upsert_entry(conn: &mut SqliteConnection, entry: &ClipboardEntry) -> Result<()> {
    let row = NewClipboardEntryRow::from_entry(entry)?;

    diesel::insert_into(dsl::clipboard_entries)
        .values(&row)
        .on_conflict(dsl::id)
        .do_update()
        .set((
            dsl::preview_text.eq(excluded(dsl::preview_text)),
            dsl::full_text.eq(excluded(dsl::full_text)),
            dsl::rich_payload_refs.eq(excluded(dsl::rich_payload_refs)),
            dsl::is_pinned.eq(excluded(dsl::is_pinned)),
            dsl::is_sensitive.eq(excluded(dsl::is_sensitive)),
        ))
        .execute(conn)?;
    Ok(())
}

/// Load every entry: pinned first (newest first), then unpinned (newest
/// first). A row that fails to decode is logged and skipped; it never aborts
/// the bulk read.
pub fn load_all(conn: &mut SqliteConnection) -> Result<Vec<ClipboardEntry>> {
    let rows = load_rows(conn)?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id.clone();
        match ClipboardEntry::try_from(row) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!("skipping undecodable history row {}: {}", id, err),
        }
    }
    Ok(entries)
}

/// Load raw rows in the full-history order.
pub fn load_rows(conn: &mut SqliteConnection) -> Result<Vec<ClipboardEntryRow>> {
    let rows = dsl::clipboard_entries
        .order((dsl::is_pinned.desc(), dsl::captured_at.desc()))
        .select(ClipboardEntryRow::as_select())
        .load(conn)?;
    Ok(rows)
}

/// All entry ids, used by row-by-row salvage.
pub fn list_ids(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let ids = dsl::clipboard_entries.select(dsl::id).load(conn)?;
    Ok(ids)
}

/// Fetch one raw row by id.
pub fn find_row(conn: &mut SqliteConnection, id: &str) -> Result<Option<ClipboardEntryRow>> {
    let row = dsl::clipboard_entries
        .find(id)
        .select(ClipboardEntryRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row)
}

/// Fetch one entry by id; a broken row surfaces as `InvalidData` here since
/// there is no bulk read to skip it from.
pub fn find_entry(conn: &mut SqliteConnection, id: &str) -> Result<Option<ClipboardEntry>> {
    match find_row(conn, id)? {
        Some(row) => Ok(Some(ClipboardEntry::try_from(row)?)),
        None => Ok(None),
    }
}

/// Delete one entry by id. Returns whether a row was removed.
pub fn delete_entry(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
    let deleted = diesel::delete(dsl::clipboard_entries.find(id)).execute(conn)?;
    Ok(deleted > 0)
}

/// Trim unpinned entries down to the `keep_max` most recent ones.
///
/// A single set-based DELETE so large histories do not round-trip row ids
/// through the application. Pinned entries are never touched.
pub fn delete_oldest(conn: &mut SqliteConnection, keep_max: usize) -> Result<usize> {
    let deleted = diesel::sql_query(
        "DELETE FROM clipboard_entries \
         WHERE is_pinned = 0 AND id NOT IN ( \
             SELECT id FROM clipboard_entries WHERE is_pinned = 0 \
             ORDER BY captured_at DESC LIMIT ?)",
    )
    .bind::<diesel::sql_types::BigInt, _>(keep_max as i64)
    .execute(conn)?;
    Ok(deleted)
}

/// Delete all entries, or all unpinned entries when `keep_pinned` is set.
pub fn clear(conn: &mut SqliteConnection, keep_pinned: bool) -> Result<usize> {
    let deleted = if keep_pinned {
        diesel::delete(dsl::clipboard_entries.filter(dsl::is_pinned.eq(false))).execute(conn)?
    } else {
        diesel::delete(dsl::clipboard_entries).execute(conn)?
    };
    Ok(deleted)
}

/// Total number of entries.
pub fn count_entries(conn: &mut SqliteConnection) -> Result<i64> {
    let count = dsl::clipboard_entries.count().get_result(conn)?;
    Ok(count)
}
