//! Notetype manager.
//!
//! # Responsibility
//! - Hold the notetype registry deserialized from the collection row.
//! - Allocate timestamp-derived ids for new notetypes.

use super::{ManagerError, ManagerResult};
use crate::clock::now_millis;
use crate::model::notetype::Notetype;
use crate::model::NotetypeId;
use std::collections::HashMap;

/// Registry of notetypes, keyed by id.
#[derive(Default)]
pub struct NotetypeManager {
    notetypes: HashMap<NotetypeId, Notetype>,
    changed: bool,
}

impl NotetypeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces state from the persisted blob.
    pub fn load(&mut self, blob: &str) -> ManagerResult<()> {
        self.notetypes = serde_json::from_str(blob).map_err(|err| ManagerError::BadBlob {
            what: "notetypes",
            message: err.to_string(),
        })?;
        self.changed = false;
        Ok(())
    }

    /// Serializes state for the persisted blob.
    pub fn to_blob(&self) -> ManagerResult<String> {
        serde_json::to_string(&self.notetypes).map_err(|err| ManagerError::BadBlob {
            what: "notetypes",
            message: err.to_string(),
        })
    }

    pub fn get(&self, id: NotetypeId) -> Option<&Notetype> {
        self.notetypes.get(&id)
    }

    /// Registers a notetype, allocating an id when the caller left it 0.
    pub fn add(&mut self, mut notetype: Notetype) -> NotetypeId {
        if notetype.id == 0 {
            notetype.id = self.unique_id();
        }
        let id = notetype.id;
        self.notetypes.insert(id, notetype);
        self.changed = true;
        id
    }

    pub fn remove(&mut self, id: NotetypeId) {
        if self.notetypes.remove(&id).is_some() {
            self.changed = true;
        }
    }

    pub fn all_ids(&self) -> Vec<NotetypeId> {
        let mut ids: Vec<NotetypeId> = self.notetypes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.notetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notetypes.is_empty()
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn mark_saved(&mut self) {
        self.changed = false;
    }

    /// Resets per-notetype USNs ahead of a full upload.
    pub fn before_upload(&mut self) {
        for notetype in self.notetypes.values_mut() {
            notetype.usn = 0;
        }
        self.changed = true;
    }

    fn unique_id(&self) -> NotetypeId {
        let mut id = now_millis();
        while self.notetypes.contains_key(&id) {
            id += 1;
        }
        id
    }
}
