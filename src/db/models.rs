//! Row types for the `clipboard_entries` table and row/domain mapping.
//!
//! All row validation lives here: a row that decodes structurally but
//! violates the entry invariants (empty preview, undecodable refs column)
//! is rejected with [`StorageError::InvalidData`].

use diesel::prelude::*;

use crate::db::schema::clipboard_entries;
use crate::entry::{ClipboardEntry, EntryId};
use crate::error::{Result, StorageError};

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = clipboard_entries)]
pub struct ClipboardEntryRow {
    pub id: String,
    pub preview_text: String,
    pub full_text: Option<String>,
    /// JSON array of reference paths, NULL when the entry has none.
    pub rich_payload_refs: Option<String>,
    /// Unix epoch milliseconds.
    pub captured_at: i64,
    pub is_pinned: bool,
    pub is_sensitive: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = clipboard_entries)]
pub struct NewClipboardEntryRow {
    pub id: String,
    pub preview_text: String,
    pub full_text: Option<String>,
    pub rich_payload_refs: Option<String>,
    pub captured_at: i64,
    pub is_pinned: bool,
    pub is_sensitive: bool,
}

/// Encode reference paths for the nullable refs column (empty == NULL).
fn encode_refs(refs: &[String]) -> Result<Option<String>> {
    if refs.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(refs)?))
    }
}

fn decode_refs(raw: Option<&str>) -> Result<Vec<String>> {
    match raw {
        None => Ok(Vec::new()),
        Some(s) => Ok(serde_json::from_str(s)?),
    }
}

impl NewClipboardEntryRow {
    pub fn from_entry(entry: &ClipboardEntry) -> Result<Self> {
        if entry.preview_text.is_empty() {
            return Err(StorageError::InvalidData(format!(
                "entry {} has an empty preview text",
                entry.id
            )));
        }

        Ok(Self {
            id: entry.id.as_str().to_string(),
            preview_text: entry.preview_text.clone(),
            full_text: entry.full_text.clone(),
            rich_payload_refs: encode_refs(&entry.rich_payload_refs)?,
            captured_at: entry.captured_at_ms,
            is_pinned: entry.is_pinned,
            is_sensitive: entry.is_sensitive,
        })
    }
}

impl TryFrom<ClipboardEntryRow> for ClipboardEntry {
    type Error = StorageError;

    fn try_from(row: ClipboardEntryRow) -> Result<Self> {
        if row.preview_text.is_empty() {
            return Err(StorageError::InvalidData(format!(
                "entry {} has an empty preview text",
                row.id
            )));
        }

        Ok(ClipboardEntry {
            id: EntryId::new(row.id),
            preview_text: row.preview_text,
            full_text: row.full_text,
            rich_payload_refs: decode_refs(row.rich_payload_refs.as_deref())?,
            captured_at_ms: row.captured_at,
            is_pinned: row.is_pinned,
            is_sensitive: row.is_sensitive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> ClipboardEntryRow {
        ClipboardEntryRow {
            id: "a".to_string(),
            preview_text: "hello".to_string(),
            full_text: None,
            rich_payload_refs: Some(r#"["blob/a.png"]"#.to_string()),
            captured_at: 100,
            is_pinned: false,
            is_sensitive: false,
        }
    }

    #[test]
    fn test_row_round_trips_to_domain() {
        let entry = ClipboardEntry::try_from(sample_row()).expect("valid row");
        assert_eq!(entry.id.as_str(), "a");
        assert_eq!(entry.rich_payload_refs, vec!["blob/a.png".to_string()]);
    }

    #[test]
    fn test_empty_preview_is_invalid() {
        let mut row = sample_row();
        row.preview_text.clear();
        let err = ClipboardEntry::try_from(row).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[test]
    fn test_bad_refs_json_is_invalid() {
        let mut row = sample_row();
        row.rich_payload_refs = Some("not json".to_string());
        let err = ClipboardEntry::try_from(row).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[test]
    fn test_empty_preview_rejected_on_encode() {
        let entry = ClipboardEntry::new(EntryId::from("a"), "", 1);
        let err = NewClipboardEntryRow::from_entry(&entry).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[test]
    fn test_empty_refs_encode_to_null() {
        let entry = ClipboardEntry::new(EntryId::from("a"), "p", 1);
        let row = NewClipboardEntryRow::from_entry(&entry).expect("encodes");
        assert!(row.rich_payload_refs.is_none());
    }
}
