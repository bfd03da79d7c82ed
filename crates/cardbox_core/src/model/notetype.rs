//! Notetype (note schema) domain model.
//!
//! # Responsibility
//! - Define field and template layout for a family of notes.
//! - Distinguish standard and cloze generation behavior via a tagged enum.
//!
//! # Invariants
//! - Template and field `ord` values mirror their position in the vectors.
//! - `sort_field_idx` indexes an existing field definition.

use super::{DeckId, NotetypeId, Usn, DEFAULT_DECK_ID};
use serde::{Deserialize, Serialize};

/// Card-generation behavior of a notetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotetypeKind {
    /// One card per non-empty template.
    Standard,
    /// One card per distinct cloze group found in the fields.
    Cloze,
}

/// Named, ordered field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub ord: u16,
    pub name: String,
}

/// Question/answer format pair with an ordinal and optional deck override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub ord: u16,
    pub name: String,
    pub qfmt: String,
    pub afmt: String,
    /// Cards from this template land here instead of the notetype default.
    pub deck_override: Option<DeckId>,
}

/// Schema for a family of notes: field names plus one or more templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notetype {
    pub id: NotetypeId,
    pub name: String,
    pub kind: NotetypeKind,
    pub fields: Vec<FieldDef>,
    pub templates: Vec<CardTemplate>,
    /// Which field feeds the sortable display cache.
    pub sort_field_idx: usize,
    pub default_deck_id: DeckId,
    pub usn: Usn,
}

impl Notetype {
    /// Stock two-field, one-template standard notetype.
    pub fn new_basic(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            kind: NotetypeKind::Standard,
            fields: vec![
                FieldDef {
                    ord: 0,
                    name: "Front".to_string(),
                },
                FieldDef {
                    ord: 1,
                    name: "Back".to_string(),
                },
            ],
            templates: vec![CardTemplate {
                ord: 0,
                name: "Card 1".to_string(),
                qfmt: "{{Front}}".to_string(),
                afmt: "{{FrontSide}}<hr>{{Back}}".to_string(),
                deck_override: None,
            }],
            sort_field_idx: 0,
            default_deck_id: DEFAULT_DECK_ID,
            usn: 0,
        }
    }

    /// Stock cloze notetype with a single `Text` field.
    pub fn new_cloze(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            kind: NotetypeKind::Cloze,
            fields: vec![FieldDef {
                ord: 0,
                name: "Text".to_string(),
            }],
            templates: vec![CardTemplate {
                ord: 0,
                name: "Cloze".to_string(),
                qfmt: "{{cloze:Text}}".to_string(),
                afmt: "{{cloze:Text}}".to_string(),
                deck_override: None,
            }],
            sort_field_idx: 0,
            default_deck_id: DEFAULT_DECK_ID,
            usn: 0,
        }
    }

    /// Looks up a template by ordinal.
    pub fn template(&self, ord: u16) -> Option<&CardTemplate> {
        self.templates.iter().find(|template| template.ord == ord)
    }

    /// Index of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Notetype, NotetypeKind};

    #[test]
    fn basic_notetype_has_two_fields_one_template() {
        let notetype = Notetype::new_basic("Basic");
        assert_eq!(notetype.kind, NotetypeKind::Standard);
        assert_eq!(notetype.fields.len(), 2);
        assert_eq!(notetype.templates.len(), 1);
        assert_eq!(notetype.field_index("Back"), Some(1));
    }

    #[test]
    fn cloze_notetype_is_single_template() {
        let notetype = Notetype::new_cloze("Cloze");
        assert_eq!(notetype.kind, NotetypeKind::Cloze);
        assert!(notetype.template(0).is_some());
        assert!(notetype.template(1).is_none());
    }
}
