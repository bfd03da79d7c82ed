//! Core collection management for the Cardbox flashcard system.
//!
//! Owns the mapping between notes, cards, notetypes and decks in an
//! embedded SQLite datastore, and the invariants that must hold across bulk
//! operations: card generation and removal, deletion logging, undo and
//! integrity repair. The spaced-repetition algorithm, template rendering
//! internals, media storage and the sync transport are external
//! collaborators behind the seams in [`sched`], [`render`], [`media`] and
//! [`hooks`].

mod clock;
pub mod collection;
pub mod db;
pub mod hooks;
pub mod logging;
pub mod manager;
pub mod media;
pub mod model;
pub mod render;
pub mod repo;
pub mod sched;
pub mod text;

pub use collection::card_gen::PreviewMode;
pub use collection::qa::{QaFilter, QaRow, RenderedCard};
pub use collection::undo::UndoState;
pub use collection::{
    Collection, CollectionConfig, CollectionError, CollectionMetadata, CollectionResult,
};
pub use model::card::{Card, CardQueue, CardType};
pub use model::deck::{Deck, NewCardOrder};
pub use model::grave::{Grave, GraveKind};
pub use model::note::Note;
pub use model::notetype::{CardTemplate, FieldDef, Notetype, NotetypeKind};
pub use model::{CardId, DeckId, NoteId, NotetypeId, Usn, DEFAULT_DECK_ID, OFFLINE_USN};
