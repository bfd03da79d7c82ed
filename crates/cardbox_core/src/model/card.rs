//! Card domain model.
//!
//! # Responsibility
//! - Define the schedulable instance of a note bound to one template ordinal.
//! - Map queue/type state tags to their persisted integer codes.
//!
//! # Invariants
//! - `note_id` must reference an existing note.
//! - For standard notetypes `template_ord` indexes an existing template; for
//!   cloze notetypes any ordinal naming a detected cloze group is valid.
//! - `due` is a queue position for new cards and a day offset for reviews.

use super::{CardId, DeckId, NoteId, Usn};

/// Scheduling lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    New,
    Learn,
    Review,
    Relearn,
}

/// Queue the card currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardQueue {
    New,
    Learn,
    Review,
    DayLearn,
    Suspended,
    SchedBuried,
    UserBuried,
}

/// One renderable, schedulable instance of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub note_id: NoteId,
    pub deck_id: DeckId,
    /// Which template of the note's notetype produced this card.
    pub template_ord: u16,
    pub ctype: CardType,
    pub queue: CardQueue,
    /// New-card position or review day offset, depending on `queue`.
    pub due: i32,
    pub mtime_ms: i64,
    pub usn: Usn,
}

impl Card {
    /// Creates a new-queue card for the given note/template/deck placement.
    pub fn new(
        id: CardId,
        note_id: NoteId,
        deck_id: DeckId,
        template_ord: u16,
        due: i32,
        mtime_ms: i64,
        usn: Usn,
    ) -> Self {
        Self {
            id,
            note_id,
            deck_id,
            template_ord,
            ctype: CardType::New,
            queue: CardQueue::New,
            due,
            mtime_ms,
            usn,
        }
    }
}

pub(crate) fn card_type_to_db(ctype: CardType) -> i64 {
    match ctype {
        CardType::New => 0,
        CardType::Learn => 1,
        CardType::Review => 2,
        CardType::Relearn => 3,
    }
}

pub(crate) fn parse_card_type(value: i64) -> Option<CardType> {
    match value {
        0 => Some(CardType::New),
        1 => Some(CardType::Learn),
        2 => Some(CardType::Review),
        3 => Some(CardType::Relearn),
        _ => None,
    }
}

pub(crate) fn card_queue_to_db(queue: CardQueue) -> i64 {
    match queue {
        CardQueue::New => 0,
        CardQueue::Learn => 1,
        CardQueue::Review => 2,
        CardQueue::DayLearn => 3,
        CardQueue::Suspended => -1,
        CardQueue::SchedBuried => -2,
        CardQueue::UserBuried => -3,
    }
}

pub(crate) fn parse_card_queue(value: i64) -> Option<CardQueue> {
    match value {
        0 => Some(CardQueue::New),
        1 => Some(CardQueue::Learn),
        2 => Some(CardQueue::Review),
        3 => Some(CardQueue::DayLearn),
        -1 => Some(CardQueue::Suspended),
        -2 => Some(CardQueue::SchedBuried),
        -3 => Some(CardQueue::UserBuried),
        _ => None,
    }
}
