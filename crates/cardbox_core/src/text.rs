//! Field text utilities shared by the field cache, card generator and QA
//! assembler.
//!
//! # Responsibility
//! - Strip HTML markup and sound references from field content.
//! - Compute the stable duplicate-detection checksum for a field.
//! - Extract cloze group ordinals and template field references.
//!
//! # Invariants
//! - `field_checksum` is deterministic across platforms and releases.
//! - Cloze group numbers in content are 1-based; returned ordinals are
//!   0-based.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static STYLE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(style|script)[^>]*>.*?</(style|script)>").expect("valid style regex"));
static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));
static SOUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[sound:[^\]]+\]").expect("valid sound regex"));
static CLOZE_GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{c(\d+)::").expect("valid cloze regex"));
pub(crate) static FIELD_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("valid field ref regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Pseudo-fields injected by the QA assembler; never note fields.
const SPECIAL_FIELDS: &[&str] = &["FrontSide", "Tags", "Type", "Deck", "Card"];

/// Removes HTML markup, sound references and entity noise from field text.
///
/// Used for the sortable display cache and for checksum input.
pub fn strip_markup(text: &str) -> String {
    let stripped = STYLE_BLOCK_RE.replace_all(text, "");
    let stripped = SOUND_RE.replace_all(&stripped, "");
    let stripped = HTML_TAG_RE.replace_all(&stripped, "");
    let decoded = decode_entities(&stripped);
    WHITESPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Removes sound references only; markup is kept for re-rendering.
pub fn strip_sounds(text: &str) -> String {
    SOUND_RE.replace_all(text, "").into_owned()
}

/// Duplicate-detection checksum of one field.
///
/// FNV-1a 64 over the markup-stripped content, folded to 32 bits to match
/// the column width.
pub fn field_checksum(text: &str) -> u32 {
    let digest = fnv1a64(strip_markup(text).as_bytes());
    (digest ^ (digest >> 32)) as u32
}

/// Distinct cloze group ordinals present in the given fields, 0-based.
///
/// A `{{c3::...}}` group contributes ordinal 2; group number 0 is ignored.
pub fn cloze_ordinals(fields: &[String]) -> BTreeSet<u16> {
    let mut ordinals = BTreeSet::new();
    for field in fields {
        for capture in CLOZE_GROUP_RE.captures_iter(field) {
            if let Ok(group) = capture[1].parse::<u16>() {
                if group > 0 {
                    ordinals.insert(group - 1);
                }
            }
        }
    }
    ordinals
}

/// Field names referenced by a template format string.
///
/// Modifier prefixes (`{{text:Front}}`, `{{cloze:Text}}`) are stripped to
/// the final segment; section tags (`{{#Tag}}`, `{{/Tag}}`, `{{^Tag}}`) and
/// the QA pseudo-fields are skipped.
pub fn template_field_refs(format: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for capture in FIELD_REF_RE.captures_iter(format) {
        let inner = capture[1].trim();
        if inner.starts_with(['#', '/', '^']) {
            continue;
        }
        let name = inner.rsplit(':').next().unwrap_or(inner).trim();
        if name.is_empty() || SPECIAL_FIELDS.contains(&name) {
            continue;
        }
        refs.push(name.to_string());
    }
    refs
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut digest = OFFSET;
    for &byte in bytes {
        digest ^= u64::from(byte);
        digest = digest.wrapping_mul(PRIME);
    }
    digest
}

#[cfg(test)]
mod tests {
    use super::{cloze_ordinals, field_checksum, strip_markup, strip_sounds, template_field_refs};

    #[test]
    fn strip_markup_removes_tags_sounds_and_entities() {
        let text = "<b>bonjour</b> [sound:hello.mp3] &amp; <style>p{}</style>au revoir";
        assert_eq!(strip_markup(text), "bonjour & au revoir");
    }

    #[test]
    fn strip_sounds_keeps_markup() {
        assert_eq!(strip_sounds("<b>hi</b>[sound:x.ogg]"), "<b>hi</b>");
    }

    #[test]
    fn field_checksum_is_stable_and_markup_insensitive() {
        assert_eq!(field_checksum("word"), field_checksum("<i>word</i>"));
        assert_ne!(field_checksum("word"), field_checksum("other"));
    }

    #[test]
    fn cloze_ordinals_are_zero_based_and_deduplicated() {
        let fields = vec!["{{c1::foo}} {{c2::bar}} {{c1::baz}}".to_string()];
        let ordinals: Vec<u16> = cloze_ordinals(&fields).into_iter().collect();
        assert_eq!(ordinals, vec![0, 1]);
    }

    #[test]
    fn cloze_ordinals_ignore_group_zero() {
        let fields = vec!["{{c0::never}}".to_string()];
        assert!(cloze_ordinals(&fields).is_empty());
    }

    #[test]
    fn template_field_refs_strip_modifiers_and_skip_sections() {
        let refs = template_field_refs("{{#Tag}}{{text:Front}}{{/Tag}} {{Back}} {{FrontSide}}");
        assert_eq!(refs, vec!["Front".to_string(), "Back".to_string()]);
    }
}
