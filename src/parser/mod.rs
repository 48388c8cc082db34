pub mod blocks;
pub mod line6;
pub mod markers;
pub mod sections;
pub mod titles;

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Diagnostic;
use crate::rules::{FieldRule, FieldSource};
use sections::Normalization;

/// Extracted values of one entry, keyed by rule target.
pub type EntryFields = BTreeMap<String, String>;

#[derive(Debug, Default)]
pub struct Extraction {
    pub blocks: usize,
    pub entries: BTreeMap<u32, EntryFields>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Two-pass pipeline: document → blocks → per-entry fields.
///
/// A block whose heading does not parse is skipped; a missing start marker
/// yields an empty value for that field.
pub fn extract_document(document: &str, rules: &[FieldRule], normalization: Normalization) -> Extraction {
    let blocks = blocks::split_blocks(document);
    let mut extraction = Extraction {
        blocks: blocks.len(),
        ..Default::default()
    };

    for block in &blocks {
        let title = match titles::title_of(block.text) {
            Ok(t) => t,
            Err(d) => {
                debug!(heading = block.heading, "skipping block: {}", d);
                extraction.diagnostics.push(d);
                continue;
            }
        };

        let mut fields = EntryFields::new();
        for rule in rules {
            let value = match &rule.source {
                FieldSource::Title => title.text.clone(),
                FieldSource::Section { start, end } => {
                    match sections::extract_section(block.text, start, end.as_deref(), normalization) {
                        Some(text) => text,
                        None => {
                            let d = Diagnostic::MissingMarker {
                                ordinal: title.ordinal,
                                marker: start.clone(),
                            };
                            debug!("{}", d);
                            extraction.diagnostics.push(d);
                            String::new()
                        }
                    }
                }
            };
            fields.insert(rule.target.clone(), value);
        }

        if extraction.entries.insert(title.ordinal, fields).is_some() {
            extraction.diagnostics.push(Diagnostic::DuplicateOrdinal {
                ordinal: title.ordinal,
            });
        }
    }

    extraction
}

// ── Tests ──
