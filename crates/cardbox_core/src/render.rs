//! Template renderer collaborator contract.
//!
//! Rendering internals (conditionals, furigana, cloze display) are external;
//! the in-crate [`FieldReplacer`] performs plain `{{Field}}` substitution so
//! QA assembly is exercisable standalone.

use crate::text::FIELD_REF_RE;
use std::collections::HashMap;

/// Pure format-string renderer.
pub trait TemplateRenderer {
    fn render(&self, format: &str, fields: &HashMap<String, String>) -> String;
}

/// Minimal renderer: replaces field references with their values, dropping
/// modifier prefixes and unknown references.
#[derive(Debug, Default)]
pub struct FieldReplacer;

impl TemplateRenderer for FieldReplacer {
    fn render(&self, format: &str, fields: &HashMap<String, String>) -> String {
        FIELD_REF_RE
            .replace_all(format, |caps: &regex::Captures<'_>| {
                let inner = caps[1].trim();
                if inner.starts_with(['#', '/', '^']) {
                    return String::new();
                }
                let name = inner.rsplit(':').next().unwrap_or(inner).trim();
                fields.get(name).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}
