//! Deck domain model.
//!
//! # Invariants
//! - Filtered (dynamic) decks never own freshly generated cards; generation
//!   falls back to the default deck.

use super::{DeckId, Usn};
use serde::{Deserialize, Serialize};

/// Ordering policy for newly generated cards in a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewCardOrder {
    /// Due is the raw position counter.
    #[default]
    Sequential,
    /// Due is derived from the position with a deterministic seed so that
    /// same-note siblings share one slot.
    Random,
}

/// Named container for cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    /// Dynamic/cram decks; excluded from card generation.
    pub filtered: bool,
    pub new_card_order: NewCardOrder,
    pub usn: Usn,
}

impl Deck {
    pub fn new(id: DeckId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            filtered: false,
            new_card_order: NewCardOrder::Sequential,
            usn: 0,
        }
    }
}
