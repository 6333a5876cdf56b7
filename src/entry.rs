//! Domain model for a single clipboard snapshot.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque entry identifier, assigned by the capture producer at creation
/// and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Generate a fresh random identifier (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One clipboard snapshot as handed over by the capture producer.
///
/// `id` and `captured_at_ms` are immutable for the lifetime of the entry;
/// re-saving the same id updates every other field in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub id: EntryId,
    /// Short plain-text representation, required and non-empty.
    pub preview_text: String,
    /// Full plain-text payload when it exceeds the preview.
    pub full_text: Option<String>,
    /// Paths to auxiliary representations (rich text, markup, image) stored
    /// outside the database; only the references are persisted.
    pub rich_payload_refs: Vec<String>,
    /// Capture timestamp, Unix epoch milliseconds.
    pub captured_at_ms: i64,
    /// Pinned entries are exempt from eviction and sort first.
    pub is_pinned: bool,
    /// Informational classification flag; no behavioral effect here.
    pub is_sensitive: bool,
}

impl ClipboardEntry {
    pub fn new(id: EntryId, preview_text: impl Into<String>, captured_at_ms: i64) -> Self {
        Self {
            id,
            preview_text: preview_text.into(),
            full_text: None,
            rich_payload_refs: Vec::new(),
            captured_at_ms,
            is_pinned: false,
            is_sensitive: false,
        }
    }

    /// Convenience constructor stamping the entry with the current time.
    pub fn captured_now(id: EntryId, preview_text: impl Into<String>) -> Self {
        Self::new(id, preview_text, Utc::now().timestamp_millis())
    }

    pub fn with_full_text(mut self, full_text: impl Into<String>) -> Self {
        self.full_text = Some(full_text.into());
        self
    }

    pub fn with_rich_payload_refs(mut self, refs: Vec<String>) -> Self {
        self.rich_payload_refs = refs;
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.is_pinned = pinned;
        self
    }

    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.is_sensitive = sensitive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(EntryId::generate(), EntryId::generate());
    }

    #[test]
    fn test_entry_id_from_str() {
        let id: EntryId = "abc-123".into();
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(id.to_string(), "abc-123");
    }

    #[test]
    fn test_builder_setters() {
        let entry = ClipboardEntry::new(EntryId::from("a"), "preview", 100)
            .with_full_text("the full text")
            .with_rich_payload_refs(vec!["blob/a.rtf".to_string()])
            .pinned(true)
            .sensitive(true);

        assert_eq!(entry.full_text.as_deref(), Some("the full text"));
        assert_eq!(entry.rich_payload_refs, vec!["blob/a.rtf".to_string()]);
        assert!(entry.is_pinned);
        assert!(entry.is_sensitive);
        assert_eq!(entry.captured_at_ms, 100);
    }
}
