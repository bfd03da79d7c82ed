//! QA assembly: joining rows into renderable question/answer pairs.
//!
//! # Responsibility
//! - Join Card × Note rows under an optional predicate.
//! - Build the named-field map, inject pseudo-fields and drive the external
//!   template renderer for both sides.
//!
//! # Invariants
//! - Rows referencing a missing notetype are skipped, never fail the batch.
//! - The answer side's `FrontSide` is the already-rendered, sound-stripped
//!   question output.

use super::{Collection, CollectionResult};
use crate::hooks::FILTER_RENDERED_QA;
use crate::model::note::{split_fields, split_tags};
use crate::model::notetype::{Notetype, NotetypeKind};
use crate::model::{CardId, DeckId, NoteId, NotetypeId};
use crate::repo::{id_list_sql, RepoError};
use crate::text::{cloze_ordinals, strip_sounds};
use log::warn;
use std::collections::HashMap;

/// Help text appended when a cloze card has no active cloze deletion.
const EMPTY_CLOZE_NOTICE: &str =
    "<hr>This card's cloze deletion is missing; edit the note to restore it.";

/// Row predicate for QA assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QaFilter {
    All,
    CardIds(Vec<CardId>),
    NoteIds(Vec<NoteId>),
    NotetypeIds(Vec<NotetypeId>),
}

/// One joined Card × Note row, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaRow {
    pub card_id: CardId,
    pub note_id: NoteId,
    pub notetype_id: NotetypeId,
    pub deck_id: DeckId,
    pub ord: u16,
    pub tags: Vec<String>,
    pub fields: Vec<String>,
}

/// Rendered output for one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCard {
    pub card_id: CardId,
    pub question: String,
    pub answer: String,
}

impl Collection {
    /// Joins cards with their notes under the given predicate.
    pub fn qa_data(&self, filter: &QaFilter) -> CollectionResult<Vec<QaRow>> {
        let mut sql = String::from(
            "SELECT
                cards.id,
                cards.note_id,
                notes.notetype_id,
                cards.deck_id,
                cards.ord,
                notes.tags,
                notes.fields
             FROM cards
             INNER JOIN notes ON notes.id = cards.note_id",
        );

        match filter {
            QaFilter::All => {}
            QaFilter::CardIds(ids) => {
                sql.push_str(&format!(" WHERE cards.id IN {}", id_list_sql(ids)));
            }
            QaFilter::NoteIds(ids) => {
                sql.push_str(&format!(" WHERE cards.note_id IN {}", id_list_sql(ids)));
            }
            QaFilter::NotetypeIds(ids) => {
                sql.push_str(&format!(" WHERE notes.notetype_id IN {}", id_list_sql(ids)));
            }
        }
        sql.push_str(" ORDER BY cards.id;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut data = Vec::new();
        while let Some(row) = rows.next()? {
            let ord_raw: i64 = row.get(4)?;
            let ord = u16::try_from(ord_raw).map_err(|_| {
                RepoError::InvalidData(format!("invalid ordinal `{ord_raw}` in cards.ord"))
            })?;
            let tags: String = row.get(5)?;
            let fields: String = row.get(6)?;
            data.push(QaRow {
                card_id: row.get(0)?,
                note_id: row.get(1)?,
                notetype_id: row.get(2)?,
                deck_id: row.get(3)?,
                ord,
                tags: split_tags(&tags),
                fields: split_fields(&fields),
            });
        }
        Ok(data)
    }

    /// Renders question/answer HTML for every row matching the predicate.
    ///
    /// Rows whose notetype or template disappeared are skipped.
    pub fn render_qa(&self, filter: &QaFilter) -> CollectionResult<Vec<RenderedCard>> {
        let rows = self.qa_data(filter)?;
        Ok(rows
            .iter()
            .filter_map(|row| self.render_row(row))
            .collect())
    }

    fn render_row(&self, row: &QaRow) -> Option<RenderedCard> {
        let Some(notetype) = self.notetypes.get(row.notetype_id) else {
            warn!(
                "event=render_qa module=qa status=skip card_id={} error_code=missing_notetype",
                row.card_id
            );
            return None;
        };

        let template = match notetype.kind {
            NotetypeKind::Standard => notetype.template(row.ord),
            NotetypeKind::Cloze => notetype.templates.first(),
        };
        let Some(template) = template else {
            warn!(
                "event=render_qa module=qa status=skip card_id={} error_code=missing_template",
                row.card_id
            );
            return None;
        };

        let mut field_map = named_fields(notetype, &row.fields);
        field_map.insert("Tags".to_string(), row.tags.join(" "));
        field_map.insert("Type".to_string(), notetype.name.clone());
        field_map.insert("Deck".to_string(), self.decks.name(row.deck_id).to_string());
        field_map.insert("Card".to_string(), template.name.clone());
        // Marker consumed by cloze-aware templates: {{#c1}}...{{/c1}}.
        field_map.insert(format!("c{}", row.ord + 1), "1".to_string());

        let question_format = rewrite_cloze_refs(&template.qfmt, row.ord, "cq");
        let mut question = self.renderer.render(&question_format, &field_map);

        if notetype.kind == NotetypeKind::Cloze && !cloze_ordinals(&row.fields).contains(&row.ord)
        {
            question.push_str(EMPTY_CLOZE_NOTICE);
        }

        field_map.insert("FrontSide".to_string(), strip_sounds(&question));
        let answer_format = rewrite_cloze_refs(&template.afmt, row.ord, "ca");
        let answer = self.renderer.render(&answer_format, &field_map);

        Some(RenderedCard {
            card_id: row.card_id,
            question: self
                .hooks
                .run_text_filter(FILTER_RENDERED_QA, question),
            answer: self.hooks.run_text_filter(FILTER_RENDERED_QA, answer),
        })
    }
}

/// Maps notetype field names onto this row's values.
fn named_fields(notetype: &Notetype, fields: &[String]) -> HashMap<String, String> {
    notetype
        .fields
        .iter()
        .enumerate()
        .map(|(index, def)| {
            (
                def.name.clone(),
                fields.get(index).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

/// Rewrites `{{cloze:Field}}` references to carry the card's cloze ordinal,
/// e.g. `{{cq:2:Field}}` for the question side of ordinal 1.
fn rewrite_cloze_refs(format: &str, ord: u16, side_tag: &str) -> String {
    format.replace("{{cloze:", &format!("{{{{{side_tag}:{}:", ord + 1))
}

#[cfg(test)]
mod tests {
    use super::rewrite_cloze_refs;

    #[test]
    fn cloze_refs_embed_one_based_ordinal() {
        assert_eq!(
            rewrite_cloze_refs("{{cloze:Text}}", 0, "cq"),
            "{{cq:1:Text}}"
        );
        assert_eq!(
            rewrite_cloze_refs("{{cloze:Text}}", 2, "ca"),
            "{{ca:3:Text}}"
        );
    }

    #[test]
    fn non_cloze_formats_pass_through() {
        assert_eq!(rewrite_cloze_refs("{{Front}}", 0, "cq"), "{{Front}}");
    }
}
