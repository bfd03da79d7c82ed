//! Deletion tombstones ("graves") consumed by sync.

use super::Usn;

/// Kind of object a grave row tombstones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraveKind {
    Card,
    Note,
    Deck,
}

/// One recorded deletion, propagated to peers on the next sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grave {
    pub oid: i64,
    pub kind: GraveKind,
    pub usn: Usn,
}

pub(crate) fn grave_kind_to_db(kind: GraveKind) -> i64 {
    match kind {
        GraveKind::Card => 0,
        GraveKind::Note => 1,
        GraveKind::Deck => 2,
    }
}

pub(crate) fn parse_grave_kind(value: i64) -> Option<GraveKind> {
    match value {
        0 => Some(GraveKind::Card),
        1 => Some(GraveKind::Note),
        2 => Some(GraveKind::Deck),
        _ => None,
    }
}
