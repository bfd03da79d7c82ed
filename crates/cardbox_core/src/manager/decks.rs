//! Deck manager.
//!
//! # Responsibility
//! - Hold the deck registry deserialized from the collection row.
//! - Guarantee the default deck exists and resolve generation placement
//!   queries (filtered status, new-card ordering).

use super::{ManagerError, ManagerResult};
use crate::clock::now_millis;
use crate::model::deck::{Deck, NewCardOrder};
use crate::model::{DeckId, DEFAULT_DECK_ID};
use std::collections::HashMap;

/// Registry of decks, keyed by id.
#[derive(Default)]
pub struct DeckManager {
    decks: HashMap<DeckId, Deck>,
    changed: bool,
}

impl DeckManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, blob: &str) -> ManagerResult<()> {
        self.decks = serde_json::from_str(blob).map_err(|err| ManagerError::BadBlob {
            what: "decks",
            message: err.to_string(),
        })?;
        self.changed = false;
        Ok(())
    }

    pub fn to_blob(&self) -> ManagerResult<String> {
        serde_json::to_string(&self.decks).map_err(|err| ManagerError::BadBlob {
            what: "decks",
            message: err.to_string(),
        })
    }

    /// Creates the default deck if a fresh collection lacks it.
    pub fn ensure_default(&mut self) {
        if !self.decks.contains_key(&DEFAULT_DECK_ID) {
            self.decks
                .insert(DEFAULT_DECK_ID, Deck::new(DEFAULT_DECK_ID, "Default"));
            self.changed = true;
        }
    }

    pub fn get(&self, id: DeckId) -> Option<&Deck> {
        self.decks.get(&id)
    }

    pub fn add(&mut self, mut deck: Deck) -> DeckId {
        if deck.id == 0 {
            deck.id = self.unique_id();
        }
        let id = deck.id;
        self.decks.insert(id, deck);
        self.changed = true;
        id
    }

    /// Display name, or the default deck's name for unknown ids.
    pub fn name(&self, id: DeckId) -> &str {
        self.decks
            .get(&id)
            .or_else(|| self.decks.get(&DEFAULT_DECK_ID))
            .map(|deck| deck.name.as_str())
            .unwrap_or("Default")
    }

    /// Whether the deck is filtered/dynamic. Unknown decks are not.
    pub fn is_filtered(&self, id: DeckId) -> bool {
        self.decks.get(&id).is_some_and(|deck| deck.filtered)
    }

    /// New-card ordering policy; unknown decks fall back to sequential.
    pub fn new_card_order(&self, id: DeckId) -> NewCardOrder {
        self.decks
            .get(&id)
            .map(|deck| deck.new_card_order)
            .unwrap_or_default()
    }

    pub fn all_ids(&self) -> Vec<DeckId> {
        let mut ids: Vec<DeckId> = self.decks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn mark_saved(&mut self) {
        self.changed = false;
    }

    /// Resets per-deck USNs ahead of a full upload.
    pub fn before_upload(&mut self) {
        for deck in self.decks.values_mut() {
            deck.usn = 0;
        }
        self.changed = true;
    }

    fn unique_id(&self) -> DeckId {
        let mut id = now_millis();
        while self.decks.contains_key(&id) {
            id += 1;
        }
        id
    }
}
