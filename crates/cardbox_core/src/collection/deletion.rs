//! Deletion logging and note/card removal.
//!
//! # Responsibility
//! - Record tombstones for every removal so sync can propagate deletions.
//! - Keep the note↔card relation consistent: removing a note's last card
//!   removes the note.
//!
//! # Invariants
//! - Every removed row leaves exactly one grave at the current `usn`.
//! - Note removal is announced through the hook bus before rows disappear.

use super::{Collection, CollectionResult};
use crate::hooks::CollectionEvent;
use crate::model::grave::GraveKind;
use crate::model::{CardId, NoteId};
use crate::repo::card_repo::CardRepo;
use crate::repo::grave_repo::GraveRepo;
use crate::repo::note_repo::NoteRepo;
use log::info;

impl Collection {
    /// Records one tombstone per id for later sync propagation.
    pub fn log_removed(&mut self, ids: &[i64], kind: GraveKind) -> CollectionResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let usn = self.usn();
        GraveRepo::new(&self.conn).add_graves(ids, kind, usn)?;
        self.dirty = true;
        Ok(())
    }

    /// Removes notes by removing their cards; orphan cleanup then removes
    /// the note rows themselves.
    pub fn remove_notes(&mut self, ids: &[NoteId]) -> CollectionResult<()> {
        let card_ids = CardRepo::new(&self.conn).card_ids_of_notes(ids)?;
        self.remove_cards(&card_ids, true)
    }

    /// Removes note rows directly, emitting graves and the removal event.
    ///
    /// Internal: callers outside the facade go through [`Self::remove_notes`]
    /// so card cleanup cannot be skipped.
    pub(crate) fn remove_notes_unconditional(&mut self, ids: &[NoteId]) -> CollectionResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        self.hooks.notify(&CollectionEvent::NotesWillBeRemoved(ids));
        self.log_removed(ids, GraveKind::Note)?;
        NoteRepo::new(&self.conn).delete_notes(ids)?;
        self.dirty = true;
        info!(
            "event=notes_remove module=deletion status=ok count={}",
            ids.len()
        );
        Ok(())
    }

    /// Removes cards, then (when requested) any notes left with zero cards.
    pub fn remove_cards(
        &mut self,
        ids: &[CardId],
        also_remove_orphan_notes: bool,
    ) -> CollectionResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let note_ids = CardRepo::new(&self.conn).note_ids_of_cards(ids)?;
        self.hooks.notify(&CollectionEvent::CardsWillBeRemoved(ids));
        self.log_removed(ids, GraveKind::Card)?;
        CardRepo::new(&self.conn).delete_cards(ids)?;
        self.dirty = true;
        info!(
            "event=cards_remove module=deletion status=ok count={}",
            ids.len()
        );

        if also_remove_orphan_notes {
            let orphans = orphaned_notes(self, &note_ids)?;
            self.remove_notes_unconditional(&orphans)?;
        }
        Ok(())
    }
}

/// Subset of the candidate notes that now have zero cards.
fn orphaned_notes(col: &Collection, candidates: &[NoteId]) -> CollectionResult<Vec<NoteId>> {
    let repo = CardRepo::new(col.db());
    let mut orphans = Vec::new();
    for &note_id in candidates {
        if repo.card_ids_of_notes(&[note_id])?.is_empty() {
            orphans.push(note_id);
        }
    }
    Ok(orphans)
}
