//! Blob-backed metadata managers.
//!
//! # Responsibility
//! - Own notetype/deck/tag state loaded from the collection row's JSON
//!   blobs, with change tracking for conditional flush.
//!
//! # Invariants
//! - A manager that reports `changed() == false` costs no write at save.
//! - `before_upload` resets per-item USNs and forces a flush.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod decks;
pub mod notetypes;
pub mod tags;

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Metadata blob encode/decode failure.
#[derive(Debug)]
pub enum ManagerError {
    BadBlob {
        what: &'static str,
        message: String,
    },
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadBlob { what, message } => {
                write!(f, "invalid {what} blob: {message}")
            }
        }
    }
}

impl Error for ManagerError {}
