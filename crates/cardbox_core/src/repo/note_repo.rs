//! Note row persistence.
//!
//! # Responsibility
//! - CRUD over `notes` rows plus the batched cache-column refresh.
//! - Integrity-oriented queries over note/notetype/card relations.
//!
//! # Invariants
//! - `update_cache_columns` never touches `usn`/`mtime_ms`; a cache refresh
//!   is not an edit.
//! - Read paths reject rows whose checksum column exceeds 32 bits.

use super::{id_list_sql, RepoError, RepoResult};
use crate::model::note::{split_fields, split_tags, Note};
use crate::model::{NoteId, NotetypeId};
use rusqlite::{params, Connection, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    guid,
    notetype_id,
    mtime_ms,
    usn,
    tags,
    fields,
    sort_field,
    checksum
FROM notes";

/// Minimal projection used by card generation and cache rebuilds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    pub note_id: NoteId,
    pub notetype_id: NotetypeId,
    pub fields: Vec<String>,
}

/// SQLite accessor for `notes` rows.
pub struct NoteRepo<'conn> {
    conn: &'conn Connection,
}

impl<'conn> NoteRepo<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn add_note(&self, note: &Note) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO notes (
                id,
                guid,
                notetype_id,
                mtime_ms,
                usn,
                tags,
                fields,
                sort_field,
                checksum
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                note.id,
                note.guid.as_str(),
                note.notetype_id,
                note.mtime_ms,
                note.usn,
                note.joined_tags(),
                note.joined_fields(),
                note.sort_field.as_str(),
                i64::from(note.checksum),
            ],
        )?;
        Ok(())
    }

    pub fn update_note(&self, note: &Note) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                guid = ?1,
                notetype_id = ?2,
                mtime_ms = ?3,
                usn = ?4,
                tags = ?5,
                fields = ?6,
                sort_field = ?7,
                checksum = ?8
             WHERE id = ?9;",
            params![
                note.guid.as_str(),
                note.notetype_id,
                note.mtime_ms,
                note.usn,
                note.joined_tags(),
                note.joined_fields(),
                note.sort_field.as_str(),
                i64::from(note.checksum),
                note.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(note.id));
        }

        Ok(())
    }

    pub fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    pub fn note_exists(&self, id: NoteId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    pub fn all_note_ids(&self) -> RepoResult<Vec<NoteId>> {
        self.collect_ids("SELECT id FROM notes ORDER BY id;")
    }

    /// Field projections for the given notes, or all notes when `None`.
    pub fn field_rows(&self, ids: Option<&[NoteId]>) -> RepoResult<Vec<NoteFields>> {
        let sql = match ids {
            Some(ids) => format!(
                "SELECT id, notetype_id, fields FROM notes WHERE id IN {} ORDER BY id;",
                id_list_sql(ids)
            ),
            None => "SELECT id, notetype_id, fields FROM notes ORDER BY id;".to_string(),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut projections = Vec::new();
        while let Some(row) = rows.next()? {
            let joined: String = row.get(2)?;
            projections.push(NoteFields {
                note_id: row.get(0)?,
                notetype_id: row.get(1)?,
                fields: split_fields(&joined),
            });
        }
        Ok(projections)
    }

    /// Writes the derived sort/checksum cache columns for one note.
    pub fn update_cache_columns(
        &self,
        id: NoteId,
        sort_field: &str,
        checksum: u32,
    ) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE notes SET sort_field = ?1, checksum = ?2 WHERE id = ?3;",
            params![sort_field, i64::from(checksum), id],
        )?;
        Ok(())
    }

    pub fn delete_notes(&self, ids: &[NoteId]) -> RepoResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.conn.execute(
            &format!("DELETE FROM notes WHERE id IN {};", id_list_sql(ids)),
            [],
        )?;
        Ok(())
    }

    /// Every non-empty persisted tags column, for tag re-registration.
    pub fn all_tag_strings(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tags FROM notes WHERE tags != '';")?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            let joined: String = row.get(0)?;
            tags.extend(split_tags(&joined));
        }
        Ok(tags)
    }

    /// Notes referencing a notetype outside the known set.
    pub fn note_ids_with_notetype_not_in(
        &self,
        known: &[NotetypeId],
    ) -> RepoResult<Vec<NoteId>> {
        if known.is_empty() {
            return self.all_note_ids();
        }
        self.collect_ids(&format!(
            "SELECT id FROM notes WHERE notetype_id NOT IN {} ORDER BY id;",
            id_list_sql(known)
        ))
    }

    /// Notes with zero remaining cards (orphans).
    pub fn note_ids_without_cards(&self) -> RepoResult<Vec<NoteId>> {
        self.collect_ids(
            "SELECT id FROM notes
             WHERE id NOT IN (SELECT note_id FROM cards)
             ORDER BY id;",
        )
    }

    /// Resets the offline sentinel before a full upload.
    pub fn reset_offline_usns(&self) -> RepoResult<()> {
        self.conn
            .execute("UPDATE notes SET usn = 0 WHERE usn = -1;", [])?;
        Ok(())
    }

    fn collect_ids(&self, sql: &str) -> RepoResult<Vec<NoteId>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let checksum_raw: i64 = row.get("checksum")?;
    let checksum = u32::try_from(checksum_raw).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid checksum value `{checksum_raw}` in notes.checksum"
        ))
    })?;

    let tags: String = row.get("tags")?;
    let fields: String = row.get("fields")?;

    Ok(Note {
        id: row.get("id")?,
        guid: row.get("guid")?,
        notetype_id: row.get("notetype_id")?,
        fields: split_fields(&fields),
        tags: split_tags(&tags),
        sort_field: row.get("sort_field")?,
        checksum,
        mtime_ms: row.get("mtime_ms")?,
        usn: row.get("usn")?,
    })
}
