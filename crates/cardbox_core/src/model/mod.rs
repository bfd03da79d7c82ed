//! Domain model for the collection core.
//!
//! # Responsibility
//! - Define canonical data structures shared by generation, rendering,
//!   deletion logging and integrity repair.
//! - Keep id vocabulary and sync sentinels in one place.
//!
//! # Invariants
//! - Row ids are epoch-millisecond derived and unique per table.
//! - Rows written while offline carry [`OFFLINE_USN`] until upload.

pub mod card;
pub mod deck;
pub mod grave;
pub mod note;
pub mod notetype;

/// Stable note row id, derived from the creation timestamp.
pub type NoteId = i64;
/// Stable card row id, derived from the creation timestamp.
pub type CardId = i64;
/// Notetype id referenced by notes.
pub type NotetypeId = i64;
/// Deck id referenced by cards and templates.
pub type DeckId = i64;
/// Update-sequence number stamped on rows for incremental sync.
pub type Usn = i32;

/// Sentinel `usn` for rows not yet pushed to a sync server.
pub const OFFLINE_USN: Usn = -1;

/// The always-present default deck.
pub const DEFAULT_DECK_ID: DeckId = 1;
