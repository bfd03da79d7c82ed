//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Keep SQL row shapes and query details inside the persistence boundary.
//! - Return semantic errors (`NotFound`, `InvalidData`) in addition to DB
//!   transport errors.
//!
//! # Invariants
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories never stamp `usn`/`mtime_ms` themselves; the collection
//!   facade owns stamping policy.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod card_repo;
pub mod col_repo;
pub mod grave_repo;
pub mod note_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Row-level persistence error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(i64),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "row not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Renders an id list as a SQL `IN` operand.
///
/// Empty input renders `(NULL)`, which matches no rows under `IN`; callers
/// needing different empty-set semantics must special-case before calling.
pub(crate) fn id_list_sql(ids: &[i64]) -> String {
    if ids.is_empty() {
        return "(NULL)".to_string();
    }
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("({joined})")
}
