//! Card and review-log row persistence.
//!
//! # Responsibility
//! - CRUD over `cards` rows, including the verbatim restore path used by
//!   review undo.
//! - Integrity-oriented queries and due-value clamps.
//! - Review log (`revlog`) append/trim.
//!
//! # Invariants
//! - `restore_card` writes every column exactly as given; undo must not
//!   re-stamp `usn`/`mtime_ms`.
//! - Clamp updates stamp `usn`/`mtime_ms` so sync picks the repair up.

use super::{id_list_sql, RepoError, RepoResult};
use crate::model::card::{
    card_queue_to_db, card_type_to_db, parse_card_queue, parse_card_type, Card,
};
use crate::model::{CardId, NoteId, NotetypeId, Usn};
use rusqlite::{params, Connection, Row};

const CARD_SELECT_SQL: &str = "SELECT
    id,
    note_id,
    deck_id,
    ord,
    type,
    queue,
    due,
    mtime_ms,
    usn
FROM cards";

/// SQLite accessor for `cards` and `revlog` rows.
pub struct CardRepo<'conn> {
    conn: &'conn Connection,
}

impl<'conn> CardRepo<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn add_card(&self, card: &Card) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO cards (
                id,
                note_id,
                deck_id,
                ord,
                type,
                queue,
                due,
                mtime_ms,
                usn
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                card.id,
                card.note_id,
                card.deck_id,
                i64::from(card.template_ord),
                card_type_to_db(card.ctype),
                card_queue_to_db(card.queue),
                i64::from(card.due),
                card.mtime_ms,
                card.usn,
            ],
        )?;
        Ok(())
    }

    /// Writes every column verbatim. Used by review undo to put a snapshot
    /// back exactly as it was.
    pub fn restore_card(&self, card: &Card) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE cards
             SET
                note_id = ?1,
                deck_id = ?2,
                ord = ?3,
                type = ?4,
                queue = ?5,
                due = ?6,
                mtime_ms = ?7,
                usn = ?8
             WHERE id = ?9;",
            params![
                card.note_id,
                card.deck_id,
                i64::from(card.template_ord),
                card_type_to_db(card.ctype),
                card_queue_to_db(card.queue),
                i64::from(card.due),
                card.mtime_ms,
                card.usn,
                card.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(card.id));
        }

        Ok(())
    }

    pub fn get_card(&self, id: CardId) -> RepoResult<Option<Card>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CARD_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_card_row(row)?));
        }
        Ok(None)
    }

    pub fn cards_for_notes(&self, note_ids: &[NoteId]) -> RepoResult<Vec<Card>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "{CARD_SELECT_SQL} WHERE note_id IN {} ORDER BY id;",
            id_list_sql(note_ids)
        ))?;
        let mut rows = stmt.query([])?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(parse_card_row(row)?);
        }
        Ok(cards)
    }

    pub fn card_ids_of_notes(&self, note_ids: &[NoteId]) -> RepoResult<Vec<CardId>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.collect_ids(&format!(
            "SELECT id FROM cards WHERE note_id IN {} ORDER BY id;",
            id_list_sql(note_ids)
        ))
    }

    pub fn note_ids_of_cards(&self, card_ids: &[CardId]) -> RepoResult<Vec<NoteId>> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.collect_ids(&format!(
            "SELECT DISTINCT note_id FROM cards WHERE id IN {} ORDER BY note_id;",
            id_list_sql(card_ids)
        ))
    }

    pub fn delete_cards(&self, ids: &[CardId]) -> RepoResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.conn.execute(
            &format!("DELETE FROM cards WHERE id IN {};", id_list_sql(ids)),
            [],
        )?;
        Ok(())
    }

    pub fn max_card_id(&self) -> RepoResult<CardId> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(id) FROM cards;", [], |row| row.get(0))?;
        Ok(max.unwrap_or(0))
    }

    /// Cards whose note row no longer exists.
    pub fn card_ids_with_missing_notes(&self) -> RepoResult<Vec<CardId>> {
        self.collect_ids(
            "SELECT cards.id FROM cards
             LEFT JOIN notes ON notes.id = cards.note_id
             WHERE notes.id IS NULL
             ORDER BY cards.id;",
        )
    }

    /// Cards of a standard notetype whose ordinal indexes no template.
    pub fn card_ids_with_invalid_ord(
        &self,
        notetype_id: NotetypeId,
        template_count: usize,
    ) -> RepoResult<Vec<CardId>> {
        let mut stmt = self.conn.prepare(
            "SELECT cards.id FROM cards
             INNER JOIN notes ON notes.id = cards.note_id
             WHERE notes.notetype_id = ?1 AND cards.ord >= ?2
             ORDER BY cards.id;",
        )?;
        let mut rows = stmt.query(params![notetype_id, template_count as i64])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    /// Clamps new-card positions above the ceiling. Returns rows changed.
    pub fn clamp_new_due(&self, ceiling: i32, mtime_ms: i64, usn: Usn) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE cards
             SET due = ?1, mtime_ms = ?2, usn = ?3
             WHERE type = 0 AND due > ?1;",
            params![i64::from(ceiling), mtime_ms, usn],
        )?;
        Ok(changed)
    }

    /// Clamps implausible review due values. Returns rows changed.
    pub fn clamp_review_due(&self, ceiling: i32, mtime_ms: i64, usn: Usn) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE cards
             SET due = ?1, mtime_ms = ?2, usn = ?3
             WHERE queue = 2 AND due > ?1;",
            params![i64::from(ceiling), mtime_ms, usn],
        )?;
        Ok(changed)
    }

    /// Highest live new-card position, for counter recomputation.
    pub fn max_new_due(&self) -> RepoResult<i32> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(due) FROM cards WHERE type = 0;",
            [],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) as i32)
    }

    /// Resets the offline sentinel before a full upload.
    pub fn reset_offline_usns(&self) -> RepoResult<()> {
        self.conn
            .execute("UPDATE cards SET usn = 0 WHERE usn = -1;", [])?;
        self.conn
            .execute("UPDATE revlog SET usn = 0 WHERE usn = -1;", [])?;
        Ok(())
    }

    /// Appends one review log entry.
    pub fn add_review_entry(
        &self,
        entry_id: i64,
        card_id: CardId,
        ease: u8,
        usn: Usn,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO revlog (id, card_id, ease, usn) VALUES (?1, ?2, ?3, ?4);",
            params![entry_id, card_id, i64::from(ease), usn],
        )?;
        Ok(())
    }

    /// Deletes the most recent review log entry for one card.
    pub fn remove_latest_review_entry(&self, card_id: CardId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM revlog
             WHERE id = (SELECT MAX(id) FROM revlog WHERE card_id = ?1);",
            [card_id],
        )?;
        Ok(changed > 0)
    }

    pub fn review_entry_count(&self, card_id: CardId) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM revlog WHERE card_id = ?1;",
            [card_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn collect_ids(&self, sql: &str) -> RepoResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

fn parse_card_row(row: &Row<'_>) -> RepoResult<Card> {
    let type_raw: i64 = row.get("type")?;
    let ctype = parse_card_type(type_raw).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid card type `{type_raw}` in cards.type"))
    })?;

    let queue_raw: i64 = row.get("queue")?;
    let queue = parse_card_queue(queue_raw).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid card queue `{queue_raw}` in cards.queue"))
    })?;

    let ord_raw: i64 = row.get("ord")?;
    let template_ord = u16::try_from(ord_raw).map_err(|_| {
        RepoError::InvalidData(format!("invalid ordinal `{ord_raw}` in cards.ord"))
    })?;

    let due_raw: i64 = row.get("due")?;
    let due = i32::try_from(due_raw).map_err(|_| {
        RepoError::InvalidData(format!("invalid due value `{due_raw}` in cards.due"))
    })?;

    Ok(Card {
        id: row.get("id")?,
        note_id: row.get("note_id")?,
        deck_id: row.get("deck_id")?,
        template_ord,
        ctype,
        queue,
        due,
        mtime_ms: row.get("mtime_ms")?,
        usn: row.get("usn")?,
    })
}
