//! Field cache maintenance: sortable display field and dedup checksum.
//!
//! # Responsibility
//! - Recompute `sort_field`/`checksum` cache columns from raw field
//!   content.
//!
//! # Invariants
//! - A cache refresh is not an edit: `usn`/`mtime_ms` are never touched
//!   here; callers bump them separately when appropriate.
//! - Notes whose notetype no longer exists are skipped, never fail the
//!   batch.

use super::{Collection, CollectionResult};
use crate::model::note::Note;
use crate::model::notetype::Notetype;
use crate::model::NoteId;
use crate::repo::note_repo::NoteRepo;
use crate::text::{field_checksum, strip_markup};
use log::debug;

impl Collection {
    /// Recomputes cache columns for the given notes.
    pub fn update_field_cache(&mut self, note_ids: &[NoteId]) -> CollectionResult<()> {
        if note_ids.is_empty() {
            return Ok(());
        }

        let repo = NoteRepo::new(&self.conn);
        let rows = repo.field_rows(Some(note_ids))?;
        for row in &rows {
            let Some(notetype) = self.notetypes.get(row.notetype_id) else {
                debug!(
                    "event=field_cache module=field_cache status=skip note_id={} error_code=missing_notetype",
                    row.note_id
                );
                continue;
            };

            let (sort_field, checksum) = derive_cache(notetype, &row.fields);
            repo.update_cache_columns(row.note_id, &sort_field, checksum)?;
        }

        self.mark_dirty();
        Ok(())
    }
}

/// Refreshes the in-memory cache fields of a note prior to persisting it.
pub(crate) fn refresh_note_cache(notetype: &Notetype, note: &mut Note) {
    let (sort_field, checksum) = derive_cache(notetype, &note.fields);
    note.sort_field = sort_field;
    note.checksum = checksum;
}

fn derive_cache(notetype: &Notetype, fields: &[String]) -> (String, u32) {
    let sort_source = fields
        .get(notetype.sort_field_idx)
        .or_else(|| fields.first())
        .map(String::as_str)
        .unwrap_or("");
    let first = fields.first().map(String::as_str).unwrap_or("");
    (strip_markup(sort_source), field_checksum(first))
}
