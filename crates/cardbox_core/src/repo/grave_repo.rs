//! Grave (deletion tombstone) row persistence.
//!
//! # Invariants
//! - Graves are append-only until sync consumes them; `clear` runs only in
//!   the full-upload handoff.

use super::{RepoError, RepoResult};
use crate::model::grave::{grave_kind_to_db, parse_grave_kind, Grave, GraveKind};
use crate::model::Usn;
use rusqlite::{params, Connection};

/// SQLite accessor for `graves` rows.
pub struct GraveRepo<'conn> {
    conn: &'conn Connection,
}

impl<'conn> GraveRepo<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Appends one grave per id at the given sync generation.
    pub fn add_graves(&self, ids: &[i64], kind: GraveKind, usn: Usn) -> RepoResult<()> {
        let mut stmt = self
            .conn
            .prepare("INSERT INTO graves (oid, kind, usn) VALUES (?1, ?2, ?3);")?;
        for id in ids {
            stmt.execute(params![id, grave_kind_to_db(kind), usn])?;
        }
        Ok(())
    }

    pub fn all_graves(&self) -> RepoResult<Vec<Grave>> {
        let mut stmt = self
            .conn
            .prepare("SELECT oid, kind, usn FROM graves ORDER BY oid;")?;
        let mut rows = stmt.query([])?;
        let mut graves = Vec::new();
        while let Some(row) = rows.next()? {
            let kind_raw: i64 = row.get(1)?;
            let kind = parse_grave_kind(kind_raw).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid grave kind `{kind_raw}` in graves.kind"))
            })?;
            graves.push(Grave {
                oid: row.get(0)?,
                kind,
                usn: row.get(2)?,
            });
        }
        Ok(graves)
    }

    /// Drops all tombstones. Only valid once a full upload supersedes them.
    pub fn clear(&self) -> RepoResult<()> {
        self.conn.execute("DELETE FROM graves;", [])?;
        Ok(())
    }
}
