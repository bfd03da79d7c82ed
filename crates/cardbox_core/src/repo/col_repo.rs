//! Collection metadata row persistence.
//!
//! # Responsibility
//! - Load and flush the single `col` row.
//! - Provide the no-op lock update used to re-acquire file locking.
//!
//! # Invariants
//! - `created_ms` is written once by the schema migration and never updated.
//! - Manager blobs are written individually so an unchanged manager costs no
//!   write.

use super::{RepoError, RepoResult};
use crate::model::Usn;
use rusqlite::{params, Connection, Row};

/// Raw contents of the `col` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColRow {
    pub created_ms: i64,
    pub modified_ms: i64,
    pub schema_modified_ms: i64,
    pub last_sync_ms: i64,
    pub usn: Usn,
    pub pending_unbury: bool,
    pub config: String,
    pub notetypes: String,
    pub decks: String,
    pub tags: String,
}

/// Writable subset of the `col` row; `created_ms` and the manager blobs are
/// flushed through their own paths.
#[derive(Debug, Clone, Copy)]
pub struct MetaUpdate<'a> {
    pub modified_ms: i64,
    pub schema_modified_ms: i64,
    pub last_sync_ms: i64,
    pub usn: Usn,
    pub pending_unbury: bool,
    pub config: &'a str,
}

/// SQLite accessor for the collection metadata row.
pub struct ColRepo<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ColRepo<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Reads the metadata row.
    pub fn load(&self) -> RepoResult<ColRow> {
        let mut stmt = self.conn.prepare(
            "SELECT
                created_ms,
                modified_ms,
                schema_modified_ms,
                last_sync_ms,
                usn,
                pending_unbury,
                config,
                notetypes,
                decks,
                tags
             FROM col
             WHERE id = 1;",
        )?;

        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => parse_col_row(row),
            None => Err(RepoError::InvalidData(
                "collection metadata row is missing".to_string(),
            )),
        }
    }

    /// Writes metadata and the config blob back.
    pub fn flush_meta(&self, update: &MetaUpdate<'_>) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE col
             SET
                modified_ms = ?1,
                schema_modified_ms = ?2,
                last_sync_ms = ?3,
                usn = ?4,
                pending_unbury = ?5,
                config = ?6
             WHERE id = 1;",
            params![
                update.modified_ms,
                update.schema_modified_ms,
                update.last_sync_ms,
                update.usn,
                i64::from(update.pending_unbury),
                update.config,
            ],
        )?;
        Ok(())
    }

    pub fn write_notetypes(&self, blob: &str) -> RepoResult<()> {
        self.conn
            .execute("UPDATE col SET notetypes = ?1 WHERE id = 1;", [blob])?;
        Ok(())
    }

    pub fn write_decks(&self, blob: &str) -> RepoResult<()> {
        self.conn
            .execute("UPDATE col SET decks = ?1 WHERE id = 1;", [blob])?;
        Ok(())
    }

    pub fn write_tags(&self, blob: &str) -> RepoResult<()> {
        self.conn
            .execute("UPDATE col SET tags = ?1 WHERE id = 1;", [blob])?;
        Ok(())
    }

    /// No-op update that re-acquires file locking without touching metadata.
    pub fn touch_lock(&self) -> RepoResult<()> {
        self.conn.execute("UPDATE col SET id = id WHERE id = 1;", [])?;
        Ok(())
    }
}

fn parse_col_row(row: &Row<'_>) -> RepoResult<ColRow> {
    let pending_unbury = match row.get::<_, i64>("pending_unbury")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid pending_unbury value `{other}` in col"
            )));
        }
    };

    Ok(ColRow {
        created_ms: row.get("created_ms")?,
        modified_ms: row.get("modified_ms")?,
        schema_modified_ms: row.get("schema_modified_ms")?,
        last_sync_ms: row.get("last_sync_ms")?,
        usn: row.get("usn")?,
        pending_unbury,
        config: row.get("config")?,
        notetypes: row.get("notetypes")?,
        decks: row.get("decks")?,
        tags: row.get("tags")?,
    })
}
