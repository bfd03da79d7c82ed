//! Collection facade.
//!
//! # Responsibility
//! - Own the connection, metadata, config, metadata managers, undo state and
//!   collaborator handles, and expose the mutating operations that must keep
//!   them consistent.
//!
//! # Invariants
//! - All mutation flows through facade methods so dirty-state tracking and
//!   `usn`/`mtime_ms` stamping stay in one place.
//! - A live collection always holds the datastore write lock except across
//!   an explicit close.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::hooks::HookBus;
use crate::manager::decks::DeckManager;
use crate::manager::notetypes::NotetypeManager;
use crate::manager::tags::TagManager;
use crate::manager::ManagerError;
use crate::media::MediaHandle;
use crate::model::{DeckId, NotetypeId, Usn};
use crate::render::{FieldReplacer, TemplateRenderer};
use crate::repo::RepoError;
use crate::sched::{Scheduler, SimpleScheduler};
use log::info;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

pub mod card_gen;
pub mod deletion;
pub mod field_cache;
pub mod integrity;
pub mod qa;
pub mod storage;
pub mod undo;

use undo::UndoState;

pub type CollectionResult<T> = Result<T, CollectionError>;

/// Facade-level error taxonomy.
#[derive(Debug)]
pub enum CollectionError {
    /// Datastore or row-level failure. Fatal; not retried internally.
    Repo(RepoError),
    /// Metadata blob decode/encode failure.
    Manager(ManagerError),
    /// Operation referenced a notetype that no longer exists.
    MissingNotetype(NotetypeId),
    /// An external gate vetoed a schema-modifying operation.
    SchemaModAborted,
}

impl Display for CollectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Manager(err) => write!(f, "{err}"),
            Self::MissingNotetype(id) => write!(f, "notetype not found: {id}"),
            Self::SchemaModAborted => write!(f, "schema modification vetoed"),
        }
    }
}

impl Error for CollectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Manager(err) => Some(err),
            Self::MissingNotetype(_) => None,
            Self::SchemaModAborted => None,
        }
    }
}

impl From<RepoError> for CollectionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ManagerError> for CollectionError {
    fn from(value: ManagerError) -> Self {
        Self::Manager(value)
    }
}

impl From<DbError> for CollectionError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for CollectionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::Db(DbError::Sqlite(value)))
    }
}

/// Non-blob contents of the collection metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMetadata {
    pub created_ms: i64,
    pub modified_ms: i64,
    pub schema_modified_ms: i64,
    pub last_sync_ms: i64,
    pub usn: Usn,
    /// Set when the session left temporarily buried cards behind; cleared
    /// by cleanup on close.
    pub pending_unbury: bool,
}

/// Mutable configuration persisted in the `col.config` JSON blob.
///
/// Unknown keys are dropped on rewrite; missing keys take defaults, so old
/// collections load under newer binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Next new-card position to hand out.
    pub next_position: u32,
    pub current_deck_id: DeckId,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            next_position: 1,
            current_deck_id: crate::model::DEFAULT_DECK_ID,
        }
    }
}

/// The collection: notes, cards, notetypes and decks behind one handle.
pub struct Collection {
    conn: Connection,
    meta: CollectionMetadata,
    config: CollectionConfig,
    pub notetypes: NotetypeManager,
    pub decks: DeckManager,
    pub tags: TagManager,
    pub sched: Box<dyn Scheduler>,
    pub media: MediaHandle,
    hooks: HookBus,
    renderer: Box<dyn TemplateRenderer>,
    undo: UndoState,
    server: bool,
    dirty: bool,
    last_save: Instant,
}

impl Collection {
    /// Opens a collection file, applying pending migrations.
    pub fn open(path: impl AsRef<Path>, server: bool) -> CollectionResult<Self> {
        let conn = open_db(path)?;
        Self::from_connection(conn, server)
    }

    /// Opens an in-memory collection, mainly for tests and previews.
    pub fn open_in_memory(server: bool) -> CollectionResult<Self> {
        let conn = open_db_in_memory()?;
        Self::from_connection(conn, server)
    }

    fn from_connection(conn: Connection, server: bool) -> CollectionResult<Self> {
        let mut col = Self {
            conn,
            meta: CollectionMetadata {
                created_ms: 0,
                modified_ms: 0,
                schema_modified_ms: 0,
                last_sync_ms: 0,
                usn: 0,
                pending_unbury: false,
            },
            config: CollectionConfig::default(),
            notetypes: NotetypeManager::new(),
            decks: DeckManager::new(),
            tags: TagManager::new(),
            sched: Box::new(SimpleScheduler::new()),
            media: MediaHandle::new(),
            hooks: HookBus::new(),
            renderer: Box::new(FieldReplacer),
            undo: UndoState::Inactive,
            server,
            dirty: false,
            last_save: Instant::now(),
        };

        col.load()?;
        col.media.connect();
        col.begin()?;
        col.lock()?;
        info!("event=col_open module=collection status=ok server={server}");
        Ok(col)
    }

    /// Raw connection access for advanced callers and tests.
    pub fn db(&self) -> &Connection {
        &self.conn
    }

    pub fn meta(&self) -> &CollectionMetadata {
        &self.meta
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn is_server(&self) -> bool {
        self.server
    }

    pub fn hooks_mut(&mut self) -> &mut HookBus {
        &mut self.hooks
    }

    pub fn hooks(&self) -> &HookBus {
        &self.hooks
    }

    /// Swaps the template renderer collaborator.
    pub fn set_renderer(&mut self, renderer: Box<dyn TemplateRenderer>) {
        self.renderer = renderer;
    }

    /// Swaps the scheduler collaborator.
    pub fn set_scheduler(&mut self, sched: Box<dyn Scheduler>) {
        self.sched = sched;
    }

    /// Flags that buried cards need restoring at the next cleanup.
    pub fn set_pending_unbury(&mut self, pending: bool) {
        if self.meta.pending_unbury != pending {
            self.meta.pending_unbury = pending;
            self.dirty = true;
        }
    }
}
