//! Card generation: deriving the cards that must exist for a note.
//!
//! # Responsibility
//! - Compute available template ordinals from field content for standard
//!   and cloze notetypes.
//! - Create missing cards and flag orphaned ones during reconciliation.
//! - Resolve deck placement and due values for freshly generated cards.
//!
//! # Invariants
//! - A filtered deck never receives freshly generated cards.
//! - Same-note siblings generated together share one position slot.
//! - A note whose notetype was deleted is skipped, never fails the batch.

use super::field_cache::refresh_note_cache;
use super::{Collection, CollectionError, CollectionResult};
use crate::clock::now_millis;
use crate::manager::decks::DeckManager;
use crate::model::card::{Card, CardQueue};
use crate::model::deck::NewCardOrder;
use crate::model::note::Note;
use crate::model::notetype::{CardTemplate, Notetype, NotetypeKind};
use crate::model::{CardId, DeckId, NoteId, DEFAULT_DECK_ID, OFFLINE_USN};
use crate::repo::card_repo::CardRepo;
use crate::repo::note_repo::NoteRepo;
use crate::text::{cloze_ordinals, template_field_refs};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};

/// Template-selection mode for non-persisting card previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewMode {
    /// Only templates whose question side would render non-empty.
    NonEmpty,
    /// Only templates backing the note's existing cards.
    Existing,
    /// Every template, unconditionally.
    All,
}

impl Collection {
    /// Persists a new note and generates one card per applicable template.
    ///
    /// Returns the number of cards created. When no template applies (all
    /// question sides would render empty), nothing is written and 0 is
    /// returned.
    pub fn add_note(&mut self, note: &mut Note) -> CollectionResult<usize> {
        let templates = self.find_templates(note)?;
        if templates.is_empty() {
            return Ok(0);
        }

        let usn = self.usn();
        let now = now_millis();
        let notetype = self
            .notetypes
            .get(note.notetype_id)
            .ok_or(CollectionError::MissingNotetype(note.notetype_id))?;
        refresh_note_cache(notetype, note);
        note.mtime_ms = now;
        note.usn = usn;

        let note_repo = NoteRepo::new(&self.conn);
        note.id = next_note_id(&note_repo, now)?;
        note_repo.add_note(note)?;

        let position = take_position(&mut self.config);
        let card_repo = CardRepo::new(&self.conn);
        let mut next_card_id = next_card_id_seed(&card_repo, now)?;
        for template in &templates {
            let deck_id = resolve_new_deck(&self.decks, notetype, template, None);
            let due = due_for_deck(&self.decks, deck_id, position);
            card_repo.add_card(&Card::new(
                next_card_id,
                note.id,
                deck_id,
                template.ord,
                due,
                now,
                usn,
            ))?;
            next_card_id += 1;
        }

        self.tags.register(note.tags.iter().map(String::as_str), usn);
        self.dirty = true;
        info!(
            "event=note_add module=card_gen status=ok note_id={} cards={}",
            note.id,
            templates.len()
        );
        Ok(templates.len())
    }

    /// Rewrites an edited note, refreshing its cache columns and stamps.
    ///
    /// Callers follow up with [`Collection::gen_cards`] to reconcile the
    /// note's cards against the new field content.
    pub fn update_note(&mut self, note: &mut Note) -> CollectionResult<()> {
        let usn = self.usn();
        let notetype = self
            .notetypes
            .get(note.notetype_id)
            .ok_or(CollectionError::MissingNotetype(note.notetype_id))?;
        refresh_note_cache(notetype, note);
        note.mtime_ms = now_millis();
        note.usn = usn;

        NoteRepo::new(&self.conn).update_note(note)?;
        self.tags.register(note.tags.iter().map(String::as_str), usn);
        self.dirty = true;
        Ok(())
    }

    /// Templates that would currently produce a card for this note.
    ///
    /// Standard notetypes map available ordinals to their templates
    /// directly; cloze notetypes synthesize one re-numbered template per
    /// distinct cloze group found in the fields.
    pub fn find_templates(&self, note: &Note) -> CollectionResult<Vec<CardTemplate>> {
        let notetype = self
            .notetypes
            .get(note.notetype_id)
            .ok_or(CollectionError::MissingNotetype(note.notetype_id))?;
        Ok(available_templates(notetype, &note.fields))
    }

    /// Reconciles cards against current field content for the given notes.
    ///
    /// Creates cards for newly available ordinals and returns the ids of
    /// cards whose ordinal is no longer available, for the caller to remove.
    pub fn gen_cards(&mut self, note_ids: &[NoteId]) -> CollectionResult<Vec<CardId>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }

        let usn = self.usn();
        let now = now_millis();

        let note_repo = NoteRepo::new(&self.conn);
        let rows = note_repo.field_rows(Some(note_ids))?;
        let card_repo = CardRepo::new(&self.conn);
        let existing = card_repo.cards_for_notes(note_ids)?;

        let mut by_note: HashMap<NoteId, Vec<&Card>> = HashMap::new();
        for card in &existing {
            by_note.entry(card.note_id).or_default().push(card);
        }

        let mut next_card_id = next_card_id_seed(&card_repo, now)?;
        let mut removable = Vec::new();
        let mut created = 0usize;

        for row in &rows {
            let Some(notetype) = self.notetypes.get(row.notetype_id) else {
                warn!(
                    "event=gen_cards module=card_gen status=skip note_id={} error_code=missing_notetype",
                    row.note_id
                );
                continue;
            };

            let templates = available_templates(notetype, &row.fields);
            let available: BTreeSet<u16> =
                templates.iter().map(|template| template.ord).collect();

            let siblings = by_note.get(&row.note_id).map(Vec::as_slice).unwrap_or(&[]);
            let existing_ords: BTreeSet<u16> =
                siblings.iter().map(|card| card.template_ord).collect();
            let sibling_deck = common_deck(siblings);
            let sibling_new_due = siblings
                .iter()
                .find(|card| card.queue == CardQueue::New)
                .map(|card| card.due);

            let mut note_position: Option<u32> = None;
            for template in &templates {
                if existing_ords.contains(&template.ord) {
                    continue;
                }

                let deck_id = resolve_new_deck(&self.decks, notetype, template, sibling_deck);
                let due = match sibling_new_due {
                    Some(due) => due,
                    None => {
                        let position = match note_position {
                            Some(position) => position,
                            None => {
                                let position = take_position(&mut self.config);
                                note_position = Some(position);
                                position
                            }
                        };
                        due_for_deck(&self.decks, deck_id, position)
                    }
                };

                card_repo.add_card(&Card::new(
                    next_card_id,
                    row.note_id,
                    deck_id,
                    template.ord,
                    due,
                    now,
                    usn,
                ))?;
                next_card_id += 1;
                created += 1;
            }

            for card in siblings {
                if !available.contains(&card.template_ord) {
                    removable.push(card.id);
                }
            }
        }

        if created > 0 {
            self.dirty = true;
        }
        info!(
            "event=gen_cards module=card_gen status=ok notes={} created={created} removable={}",
            rows.len(),
            removable.len()
        );
        Ok(removable)
    }

    /// Ephemeral cards for UI preview; nothing is persisted.
    pub fn preview_cards(&self, note: &Note, mode: PreviewMode) -> CollectionResult<Vec<Card>> {
        let notetype = self
            .notetypes
            .get(note.notetype_id)
            .ok_or(CollectionError::MissingNotetype(note.notetype_id))?;

        let templates = match mode {
            PreviewMode::NonEmpty => available_templates(notetype, &note.fields),
            PreviewMode::Existing => {
                let cards = CardRepo::new(&self.conn).cards_for_notes(&[note.id])?;
                cards
                    .iter()
                    .filter_map(|card| template_for_ord(notetype, card.template_ord))
                    .collect()
            }
            PreviewMode::All => match notetype.kind {
                NotetypeKind::Standard => notetype.templates.clone(),
                NotetypeKind::Cloze => {
                    let mut templates = available_templates(notetype, &note.fields);
                    if templates.is_empty() {
                        templates.extend(template_for_ord(notetype, 0));
                    }
                    templates
                }
            },
        };

        Ok(templates
            .iter()
            .map(|template| {
                let deck_id = resolve_new_deck(&self.decks, notetype, template, None);
                Card::new(0, note.id, deck_id, template.ord, 0, 0, OFFLINE_USN)
            })
            .collect())
    }
}

/// Templates whose ordinal should currently exist for the given fields.
fn available_templates(notetype: &Notetype, fields: &[String]) -> Vec<CardTemplate> {
    match notetype.kind {
        NotetypeKind::Standard => notetype
            .templates
            .iter()
            .filter(|template| template_is_available(notetype, template, fields))
            .cloned()
            .collect(),
        NotetypeKind::Cloze => cloze_ordinals(fields)
            .into_iter()
            .filter_map(|ord| template_for_ord(notetype, ord))
            .collect(),
    }
}

/// A standard template is available iff its question side references at
/// least one non-empty note field.
fn template_is_available(notetype: &Notetype, template: &CardTemplate, fields: &[String]) -> bool {
    template_field_refs(&template.qfmt).iter().any(|name| {
        notetype
            .field_index(name)
            .and_then(|index| fields.get(index))
            .is_some_and(|field| !field.trim().is_empty())
    })
}

/// Template for an ordinal: direct lookup for standard notetypes, a
/// re-numbered clone of the shared template for cloze.
fn template_for_ord(notetype: &Notetype, ord: u16) -> Option<CardTemplate> {
    match notetype.kind {
        NotetypeKind::Standard => notetype.template(ord).cloned(),
        NotetypeKind::Cloze => notetype.templates.first().map(|base| {
            let mut template = base.clone();
            template.ord = ord;
            template
        }),
    }
}

/// Deck shared by all existing siblings, if they agree.
fn common_deck(siblings: &[&Card]) -> Option<DeckId> {
    let first = siblings.first()?.deck_id;
    siblings
        .iter()
        .all(|card| card.deck_id == first)
        .then_some(first)
}

/// Resolves the deck a freshly generated card lands in.
///
/// Template override wins, then the agreed sibling deck, then the notetype
/// default; a filtered resolution falls back to the default deck.
fn resolve_new_deck(
    decks: &DeckManager,
    notetype: &Notetype,
    template: &CardTemplate,
    sibling_deck: Option<DeckId>,
) -> DeckId {
    let resolved = template
        .deck_override
        .or(sibling_deck)
        .unwrap_or(notetype.default_deck_id);
    if decks.is_filtered(resolved) {
        DEFAULT_DECK_ID
    } else {
        resolved
    }
}

/// Due value for a new card at the given position.
///
/// Random-order decks derive the value from an RNG seeded with the position
/// itself, so cards sharing a position share a slot while staying
/// unpredictable across notes.
fn due_for_deck(decks: &DeckManager, deck_id: DeckId, position: u32) -> i32 {
    match decks.new_card_order(deck_id) {
        NewCardOrder::Sequential => position as i32,
        NewCardOrder::Random => {
            let upper = position.max(1000) as i32;
            let mut rng = StdRng::seed_from_u64(u64::from(position));
            rng.random_range(1..upper)
        }
    }
}

fn take_position(config: &mut super::CollectionConfig) -> u32 {
    let position = config.next_position;
    config.next_position += 1;
    position
}

/// Timestamp-derived note id, bumped past any existing row.
fn next_note_id(repo: &NoteRepo<'_>, now: i64) -> Result<NoteId, crate::repo::RepoError> {
    let mut id = now;
    while repo.note_exists(id)? {
        id += 1;
    }
    Ok(id)
}

/// First card id for a batch insert: above both the clock and the maximum
/// existing id, so batch-inserted cards never collide.
fn next_card_id_seed(repo: &CardRepo<'_>, now: i64) -> Result<CardId, crate::repo::RepoError> {
    Ok((repo.max_card_id()? + 1).max(now))
}
