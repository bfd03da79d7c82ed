//! Undo manager: single-review undo and named checkpoint rollback.
//!
//! # Responsibility
//! - Track the two-kind undo state as a sum type so only valid transitions
//!   are expressible.
//!
//! # Invariants
//! - Only one undo kind is live at a time.
//! - Restored review snapshots are written back verbatim; undo never
//!   re-stamps `usn`/`mtime_ms`.
//! - Checkpoint undo is bounded to "since last save": every save passes
//!   through [`Collection::mark_op`].

use super::{Collection, CollectionResult};
use crate::clock::now_millis;
use crate::model::card::Card;
use crate::model::CardId;
use crate::repo::card_repo::CardRepo;
use log::info;

/// Undo availability for the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoState {
    /// Nothing to undo.
    Inactive,
    /// Snapshots of cards answered since the stack was opened, newest last.
    ReviewUndo(Vec<Card>),
    /// Named save-point; undone by transaction rollback.
    Checkpoint(String),
}

impl Collection {
    pub fn undo_state(&self) -> &UndoState {
        &self.undo
    }

    pub fn undo_available(&self) -> bool {
        !matches!(self.undo, UndoState::Inactive)
    }

    /// Label for UI surfaces: the checkpoint name, or "Review".
    pub fn undo_label(&self) -> Option<String> {
        match &self.undo {
            UndoState::Inactive => None,
            UndoState::ReviewUndo(_) => Some("Review".to_string()),
            UndoState::Checkpoint(label) => Some(label.clone()),
        }
    }

    /// Snapshots a card about to be answered.
    ///
    /// A live checkpoint does not survive a review; it is displaced by a
    /// fresh review stack.
    pub fn mark_review(&mut self, card: &Card) {
        let snapshot = card.clone();
        match &mut self.undo {
            UndoState::ReviewUndo(stack) => stack.push(snapshot),
            _ => self.undo = UndoState::ReviewUndo(vec![snapshot]),
        }
    }

    /// Installs or clears a checkpoint at save time.
    ///
    /// A name installs a fresh checkpoint, displacing any state. No name
    /// clears only a live checkpoint; a review stack survives unnamed
    /// saves.
    pub(crate) fn mark_op(&mut self, name: Option<&str>) {
        match name {
            Some(name) if !name.is_empty() => {
                self.undo = UndoState::Checkpoint(name.to_string());
            }
            _ => {
                if matches!(self.undo, UndoState::Checkpoint(_)) {
                    self.undo = UndoState::Inactive;
                }
            }
        }
    }

    /// Drops any undo state.
    pub fn clear_undo(&mut self) {
        self.undo = UndoState::Inactive;
    }

    /// Undoes the most recent undoable thing.
    ///
    /// Review undo restores the newest snapshot verbatim, trims that card's
    /// latest review log entry and decrements the matching study counter,
    /// returning the restored card id. Checkpoint undo rolls the
    /// transaction back and returns `None`.
    pub fn undo(&mut self) -> CollectionResult<Option<CardId>> {
        match std::mem::replace(&mut self.undo, UndoState::Inactive) {
            UndoState::Inactive => Ok(None),
            UndoState::Checkpoint(label) => {
                info!("event=undo module=undo status=ok kind=checkpoint label={label}");
                self.rollback()?;
                Ok(None)
            }
            UndoState::ReviewUndo(mut stack) => {
                let Some(card) = stack.pop() else {
                    return Ok(None);
                };

                let repo = CardRepo::new(&self.conn);
                repo.restore_card(&card)?;
                repo.remove_latest_review_entry(card.id)?;

                self.sched.update_stats(card.queue, -1);
                if !stack.is_empty() {
                    self.undo = UndoState::ReviewUndo(stack);
                }
                self.dirty = true;
                info!(
                    "event=undo module=undo status=ok kind=review card_id={}",
                    card.id
                );
                Ok(Some(card.id))
            }
        }
    }

    /// Appends a review log entry for an answered card.
    ///
    /// The external scheduler calls this after mutating the card; the entry
    /// is what review undo trims back off.
    pub fn log_review(&mut self, card_id: CardId, ease: u8) -> CollectionResult<()> {
        let usn = self.usn();
        let repo = CardRepo::new(&self.conn);
        let entry_id = next_review_entry_id(&self.conn)?;
        repo.add_review_entry(entry_id, card_id, ease, usn)?;
        self.sched.bump_reps();
        self.dirty = true;
        Ok(())
    }
}

/// Timestamp-derived revlog id, bumped past any existing entry.
fn next_review_entry_id(conn: &rusqlite::Connection) -> CollectionResult<i64> {
    let max: Option<i64> = conn.query_row("SELECT MAX(id) FROM revlog;", [], |row| row.get(0))?;
    Ok(now_millis().max(max.unwrap_or(0) + 1))
}
