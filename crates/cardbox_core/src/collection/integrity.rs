//! Integrity checking and multi-pass repair.
//!
//! # Responsibility
//! - Detect dangling references, field-count mismatches and implausible
//!   positions.
//! - Repair by deletion/clamping and report in prose; repairable damage is
//!   never surfaced as an error.
//!
//! # Invariants
//! - Passes are independent; each is individually logged.
//! - Any repair marks the schema modified so the next sync is a full one.
//! - Running the repair twice without intervening mutation finds nothing
//!   the second time.

use super::{Collection, CollectionResult};
use crate::clock::now_millis;
use crate::model::notetype::NotetypeKind;
use crate::model::NotetypeId;
use crate::repo::card_repo::CardRepo;
use crate::repo::note_repo::NoteRepo;
use log::info;

/// New-card positions above this are clamped.
const NEW_DUE_CEILING: i32 = 1_000_000;
/// Review day offsets above this are considered corrupt and clamped.
const REVIEW_DUE_CEILING: i32 = 100_000;

impl Collection {
    /// Fast read-only validation of the core invariants.
    ///
    /// Cloze notetypes are exempt from ordinal validation: any ordinal
    /// naming a cloze group is legal.
    pub fn basic_check(&self) -> CollectionResult<bool> {
        let card_repo = CardRepo::new(&self.conn);
        if !card_repo.card_ids_with_missing_notes()?.is_empty() {
            return Ok(false);
        }

        let note_repo = NoteRepo::new(&self.conn);
        if !note_repo.note_ids_without_cards()?.is_empty() {
            return Ok(false);
        }
        if !note_repo
            .note_ids_with_notetype_not_in(&self.notetypes.all_ids())?
            .is_empty()
        {
            return Ok(false);
        }

        for (notetype_id, template_count) in self.standard_notetype_shapes() {
            if !card_repo
                .card_ids_with_invalid_ord(notetype_id, template_count)?
                .is_empty()
            {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Multi-pass repair. Returns a human-readable report and a success
    /// flag; `false` means the file itself is corrupt beyond in-place
    /// repair.
    pub fn fix_integrity(&mut self) -> CollectionResult<(String, bool)> {
        let verdict: String =
            self.conn
                .query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;
        if verdict != "ok" {
            return Ok((
                "Collection file is corrupt and cannot be repaired in place.".to_string(),
                false,
            ));
        }

        let usn = self.usn();
        let now = now_millis();
        let mut problems: Vec<String> = Vec::new();

        // Notes referencing a deleted notetype.
        let ids = NoteRepo::new(&self.conn).note_ids_with_notetype_not_in(&self.notetypes.all_ids())?;
        if !ids.is_empty() {
            self.remove_notes_unconditional(&ids)?;
            log_pass("missing_notetype", ids.len());
            problems.push(format!(
                "Deleted {} note(s) with a missing notetype.",
                ids.len()
            ));
        }

        // Standard-notetype cards with out-of-range ordinals.
        for (notetype_id, template_count) in self.standard_notetype_shapes() {
            let ids =
                CardRepo::new(&self.conn).card_ids_with_invalid_ord(notetype_id, template_count)?;
            if !ids.is_empty() {
                self.remove_cards(&ids, true)?;
                log_pass("invalid_ordinal", ids.len());
                problems.push(format!(
                    "Deleted {} card(s) with an invalid template ordinal.",
                    ids.len()
                ));
            }
        }

        // Notes whose field count mismatches their notetype.
        let mut mismatched = Vec::new();
        for row in NoteRepo::new(&self.conn).field_rows(None)? {
            if let Some(notetype) = self.notetypes.get(row.notetype_id) {
                if row.fields.len() != notetype.fields.len() {
                    mismatched.push(row.note_id);
                }
            }
        }
        if !mismatched.is_empty() {
            self.remove_notes_unconditional(&mismatched)?;
            log_pass("field_count", mismatched.len());
            problems.push(format!(
                "Deleted {} note(s) with a wrong field count.",
                mismatched.len()
            ));
        }

        // Notes left with zero cards.
        let ids = NoteRepo::new(&self.conn).note_ids_without_cards()?;
        if !ids.is_empty() {
            self.remove_notes_unconditional(&ids)?;
            log_pass("orphan_note", ids.len());
            problems.push(format!("Deleted {} note(s) with no cards.", ids.len()));
        }

        // Cards whose note row is gone.
        let ids = CardRepo::new(&self.conn).card_ids_with_missing_notes()?;
        if !ids.is_empty() {
            self.remove_cards(&ids, false)?;
            log_pass("orphan_card", ids.len());
            problems.push(format!(
                "Deleted {} card(s) with a missing note.",
                ids.len()
            ));
        }

        // Rebuild the tag vocabulary from what notes actually carry.
        let tag_strings = NoteRepo::new(&self.conn).all_tag_strings()?;
        self.tags
            .register_notes(tag_strings.iter().map(String::as_str), usn);
        log_pass("tags_reregistered", tag_strings.len());

        // Rebuild every note's cache columns.
        let all_ids = NoteRepo::new(&self.conn).all_note_ids()?;
        self.update_field_cache(&all_ids)?;
        log_pass("field_cache", all_ids.len());

        // New-card positions past the ceiling.
        let clamped = CardRepo::new(&self.conn).clamp_new_due(NEW_DUE_CEILING, now, usn)?;
        if clamped > 0 {
            log_pass("new_due_clamp", clamped);
            problems.push(format!(
                "Clamped {clamped} new card(s) with an out-of-range position."
            ));
        }

        // Reseed the position counter from the highest live position.
        let max_due = CardRepo::new(&self.conn).max_new_due()?;
        self.config.next_position = max_due.max(0) as u32 + 1;
        self.dirty = true;

        // Reviews with implausible day offsets.
        let clamped = CardRepo::new(&self.conn).clamp_review_due(REVIEW_DUE_CEILING, now, usn)?;
        if clamped > 0 {
            log_pass("review_due_clamp", clamped);
            problems.push(format!(
                "Clamped {clamped} review card(s) with an implausible due value."
            ));
        }

        if !problems.is_empty() {
            self.mod_schema(false)?;
        }
        self.save(None, None)?;
        self.optimize()?;

        let report = if problems.is_empty() {
            "No problems found.".to_string()
        } else {
            problems.join("\n")
        };
        Ok((report, true))
    }

    /// Reclaims storage and refreshes planner statistics, then re-locks.
    fn optimize(&mut self) -> CollectionResult<()> {
        self.commit()?;
        self.conn.execute_batch("VACUUM; ANALYZE;")?;
        self.begin()?;
        self.lock()?;
        Ok(())
    }

    fn standard_notetype_shapes(&self) -> Vec<(NotetypeId, usize)> {
        self.notetypes
            .all_ids()
            .into_iter()
            .filter_map(|id| self.notetypes.get(id))
            .filter(|notetype| notetype.kind == NotetypeKind::Standard)
            .map(|notetype| (notetype.id, notetype.templates.len()))
            .collect()
    }
}

fn log_pass(pass: &str, count: usize) {
    info!("event=integrity_pass module=integrity status=ok pass={pass} count={count}");
}
