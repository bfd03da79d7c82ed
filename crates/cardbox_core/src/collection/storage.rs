//! Persistence gateway: save/rollback discipline over the collection row.
//!
//! # Responsibility
//! - Own the standing transaction and the re-lock-after-commit discipline.
//! - Stamp `modified_ms` monotonically and flush manager blobs
//!   conditionally.
//!
//! # Invariants
//! - The datastore file is never left lock-free between operations; only
//!   `close` releases the lock.
//! - `save` always passes through `mark_op`, so checkpoint undo is bounded
//!   to "since last save".

use super::{Collection, CollectionResult};
use crate::clock::now_millis;
use crate::model::{Usn, OFFLINE_USN};
use crate::repo::card_repo::CardRepo;
use crate::repo::col_repo::{ColRepo, MetaUpdate};
use crate::repo::grave_repo::GraveRepo;
use crate::repo::note_repo::NoteRepo;
use crate::repo::RepoError;
use log::info;
use std::time::Instant;

/// Save is skipped unless this much idle time has passed.
const AUTOSAVE_IDLE_SECS: u64 = 300;

impl Collection {
    /// Reads the metadata row and re-seeds config and manager state.
    pub fn load(&mut self) -> CollectionResult<()> {
        let row = ColRepo::new(&self.conn).load()?;

        self.config = serde_json::from_str(&row.config).map_err(|err| {
            RepoError::InvalidData(format!("invalid collection config blob: {err}"))
        })?;
        self.notetypes.load(&row.notetypes)?;
        self.decks.load(&row.decks)?;
        self.decks.ensure_default();
        self.tags.load(&row.tags)?;

        self.meta.created_ms = row.created_ms;
        self.meta.modified_ms = row.modified_ms;
        self.meta.schema_modified_ms = row.schema_modified_ms;
        self.meta.last_sync_ms = row.last_sync_ms;
        self.meta.usn = row.usn;
        self.meta.pending_unbury = row.pending_unbury;
        Ok(())
    }

    /// Writes metadata back, stamping `modified_ms`.
    ///
    /// The stamp is the caller-supplied value when given, else a wall-clock
    /// value forced strictly past the previous stamp.
    pub fn flush(&mut self, mod_ms: Option<i64>) -> CollectionResult<()> {
        self.meta.modified_ms =
            mod_ms.unwrap_or_else(|| now_millis().max(self.meta.modified_ms + 1));

        let config = serde_json::to_string(&self.config).map_err(|err| {
            RepoError::InvalidData(format!("unencodable collection config: {err}"))
        })?;

        ColRepo::new(&self.conn).flush_meta(&MetaUpdate {
            modified_ms: self.meta.modified_ms,
            schema_modified_ms: self.meta.schema_modified_ms,
            last_sync_ms: self.meta.last_sync_ms,
            usn: self.meta.usn,
            pending_unbury: self.meta.pending_unbury,
            config: &config,
        })?;
        Ok(())
    }

    /// Commits pending work and re-acquires the write lock.
    ///
    /// Conditionally flushes each metadata manager, flushes the collection
    /// row only when something is dirty, records an undo checkpoint named
    /// `op` when given.
    pub fn save(&mut self, op: Option<&str>, mod_ms: Option<i64>) -> CollectionResult<()> {
        self.mark_op(op);

        let managers_flushed = self.flush_managers()?;
        if self.dirty || managers_flushed {
            self.flush(mod_ms)?;
        }

        self.commit()?;
        self.begin()?;
        self.lock()?;
        self.dirty = false;
        self.last_save = Instant::now();
        info!("event=col_save module=collection status=ok flushed={managers_flushed}");
        Ok(())
    }

    /// Saves only if the idle threshold has elapsed since the last save.
    pub fn autosave(&mut self) -> CollectionResult<()> {
        if self.last_save.elapsed().as_secs() >= AUTOSAVE_IDLE_SECS {
            self.save(None, None)?;
        }
        Ok(())
    }

    /// No-op update that re-acquires file locking without advancing
    /// `modified_ms`.
    pub fn lock(&self) -> CollectionResult<()> {
        ColRepo::new(&self.conn).touch_lock()?;
        Ok(())
    }

    /// Discards uncommitted writes, reloads metadata from disk and re-locks.
    pub fn rollback(&mut self) -> CollectionResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        self.load()?;
        self.begin()?;
        self.lock()?;
        self.dirty = false;
        info!("event=col_rollback module=collection status=ok");
        Ok(())
    }

    /// Marks the schema as changed, forcing a full sync next time.
    ///
    /// With `check`, external gates may veto while the schema is still
    /// clean; the veto surfaces as [`super::CollectionError::SchemaModAborted`].
    pub fn mod_schema(&mut self, check: bool) -> CollectionResult<()> {
        if !self.schema_changed()
            && check
            && !self.hooks.run_gates(crate::hooks::GATE_SCHEMA_WILL_CHANGE)
        {
            return Err(super::CollectionError::SchemaModAborted);
        }
        self.meta.schema_modified_ms = now_millis().max(self.meta.schema_modified_ms + 1);
        self.dirty = true;
        Ok(())
    }

    /// True iff the schema changed since the last sync.
    pub fn schema_changed(&self) -> bool {
        self.meta.schema_modified_ms > self.meta.last_sync_ms
    }

    /// Live update-sequence counter in server mode, else the offline
    /// sentinel.
    pub fn usn(&self) -> Usn {
        if self.server {
            self.meta.usn
        } else {
            OFFLINE_USN
        }
    }

    /// Prepares a full-state upload: resets row USNs, clears graves, bumps
    /// the counter, forces schema-changed, then closes.
    pub fn before_upload(mut self) -> CollectionResult<()> {
        NoteRepo::new(&self.conn).reset_offline_usns()?;
        CardRepo::new(&self.conn).reset_offline_usns()?;
        GraveRepo::new(&self.conn).clear()?;

        self.notetypes.before_upload();
        self.decks.before_upload();
        self.tags.before_upload();
        self.meta.usn += 1;
        self.mod_schema(false)?;
        self.meta.last_sync_ms = self.meta.schema_modified_ms;
        self.dirty = true;
        self.save(None, None)?;
        self.close(true)
    }

    /// Runs interrupted-state cleanup, saves or rolls back, and releases
    /// every resource including the media subsystem.
    pub fn close(mut self, save: bool) -> CollectionResult<()> {
        self.cleanup()?;
        if save {
            self.save(None, None)?;
        } else {
            self.rollback()?;
        }
        self.commit()?;
        self.media.close();
        info!("event=col_close module=collection status=ok saved={save}");
        Ok(())
    }

    pub(crate) fn begin(&self) -> CollectionResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN;")?;
        }
        Ok(())
    }

    pub(crate) fn commit(&self) -> CollectionResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT;")?;
        }
        Ok(())
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn cleanup(&mut self) -> CollectionResult<()> {
        if self.meta.pending_unbury {
            self.sched.unbury_cards(&self.conn)?;
            self.meta.pending_unbury = false;
            self.dirty = true;
        }
        Ok(())
    }

    fn flush_managers(&mut self) -> CollectionResult<bool> {
        let repo = ColRepo::new(&self.conn);
        let mut flushed = false;

        if self.notetypes.changed() {
            repo.write_notetypes(&self.notetypes.to_blob()?)?;
            self.notetypes.mark_saved();
            flushed = true;
        }
        if self.decks.changed() {
            repo.write_decks(&self.decks.to_blob()?)?;
            self.decks.mark_saved();
            flushed = true;
        }
        if self.tags.changed() {
            repo.write_tags(&self.tags.to_blob()?)?;
            self.tags.mark_saved();
            flushed = true;
        }

        Ok(flushed)
    }
}
