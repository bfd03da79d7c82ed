//! Tag manager.
//!
//! # Responsibility
//! - Track the registered tag vocabulary with the sync generation each tag
//!   was first seen at.
//!
//! # Invariants
//! - Tag names are normalized to lowercase; duplicates collapse.

use super::{ManagerError, ManagerResult};
use crate::model::Usn;
use std::collections::BTreeMap;

/// Registered tag vocabulary.
#[derive(Default)]
pub struct TagManager {
    tags: BTreeMap<String, Usn>,
    changed: bool,
}

impl TagManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, blob: &str) -> ManagerResult<()> {
        self.tags = serde_json::from_str(blob).map_err(|err| ManagerError::BadBlob {
            what: "tags",
            message: err.to_string(),
        })?;
        self.changed = false;
        Ok(())
    }

    pub fn to_blob(&self) -> ManagerResult<String> {
        serde_json::to_string(&self.tags).map_err(|err| ManagerError::BadBlob {
            what: "tags",
            message: err.to_string(),
        })
    }

    /// Registers tags at the given sync generation.
    pub fn register<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>, usn: Usn) {
        for tag in tags {
            let normalized = tag.trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            if !self.tags.contains_key(&normalized) {
                self.tags.insert(normalized, usn);
                self.changed = true;
            }
        }
    }

    /// Rebuilds the vocabulary from all note tags.
    pub fn register_notes<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>, usn: Usn) {
        self.tags.clear();
        self.changed = true;
        self.register(tags, usn);
    }

    pub fn all(&self) -> Vec<&str> {
        self.tags.keys().map(String::as_str).collect()
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn mark_saved(&mut self) {
        self.changed = false;
    }

    /// Resets tag USNs ahead of a full upload.
    pub fn before_upload(&mut self) {
        for usn in self.tags.values_mut() {
            *usn = 0;
        }
        self.changed = true;
    }
}
