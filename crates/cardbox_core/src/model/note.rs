//! Note domain model.
//!
//! # Responsibility
//! - Define the user-content record from which cards are generated.
//! - Own the persisted field/tag encodings.
//!
//! # Invariants
//! - `fields.len()` must equal the owning notetype's field count.
//! - `guid` is stable and never reused for another note.
//! - `sort_field`/`checksum` are derived caches; the raw fields are the
//!   source of truth.

use super::{NoteId, NotetypeId, Usn, OFFLINE_USN};
use crate::model::notetype::Notetype;
use uuid::Uuid;

/// Unit separator joining fields in the `notes.fields` column.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// One set of field values sharing a notetype with zero or more cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Creation-timestamp derived id; 0 until first persisted.
    pub id: NoteId,
    /// Globally unique identity for sync/import matching.
    pub guid: String,
    pub notetype_id: NotetypeId,
    /// Ordered field values; count fixed by the notetype.
    pub fields: Vec<String>,
    pub tags: Vec<String>,
    /// Markup-stripped cache of the notetype's sort field.
    pub sort_field: String,
    /// Duplicate-detection hash of the first field.
    pub checksum: u32,
    pub mtime_ms: i64,
    pub usn: Usn,
}

impl Note {
    /// Creates an unpersisted note shaped for the given notetype.
    pub fn new(notetype: &Notetype) -> Self {
        Self {
            id: 0,
            guid: Uuid::new_v4().to_string(),
            notetype_id: notetype.id,
            fields: vec![String::new(); notetype.fields.len()],
            tags: Vec::new(),
            sort_field: String::new(),
            checksum: 0,
            mtime_ms: 0,
            usn: OFFLINE_USN,
        }
    }

    /// Joins fields for the persisted column encoding.
    pub fn joined_fields(&self) -> String {
        join_fields(&self.fields)
    }

    /// Joins tags for the persisted column encoding.
    pub fn joined_tags(&self) -> String {
        self.tags.join(" ")
    }
}

/// Joins field values on the unit separator.
pub fn join_fields(fields: &[String]) -> String {
    fields.join(&FIELD_SEPARATOR.to_string())
}

/// Splits a persisted `fields` column back into field values.
pub fn split_fields(joined: &str) -> Vec<String> {
    joined
        .split(FIELD_SEPARATOR)
        .map(str::to_string)
        .collect()
}

/// Splits a persisted space-separated tags column.
pub fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
