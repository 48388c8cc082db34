use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::markers::{repair_mojibake, scan_markers};

/// A newline followed by one or more blank (or whitespace-only) lines.
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+").unwrap());

/// How runs of blank lines inside extracted text are canonicalised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// Paragraphs separated by exactly one blank line.
    #[default]
    BlankLine,
    /// No blank lines at all: every run of newlines becomes one.
    SingleNewline,
}

impl Normalization {
    /// Collapse newline runs only; no trimming or repair.
    pub fn collapse(self, text: &str) -> String {
        let replacement = match self {
            Normalization::BlankLine => "\n\n",
            Normalization::SingleNewline => "\n",
        };
        BLANK_RUN_RE.replace_all(text, replacement).into_owned()
    }

    /// Canonical form of any extracted span.
    pub fn finish(self, raw: &str) -> String {
        let repaired = repair_mojibake(raw);
        self.collapse(repaired.trim())
    }
}

/// Text between `start` and `end` inside `block`.
///
/// Returns `None` when the start marker is absent. The end marker is looked
/// for only after the start marker; without one the section runs to the end
/// of the block.
pub fn extract_section(
    block: &str,
    start: &str,
    end: Option<&str>,
    normalization: Normalization,
) -> Option<String> {
    let markers: Vec<&str> = std::iter::once(start).chain(end).collect();
    let hits = scan_markers(block, &markers);

    let opening = hits.iter().position(|h| h.marker == 0)?;
    let from = hits[opening].end;
    let to = hits[opening + 1..]
        .iter()
        .find(|h| h.marker == 1)
        .map(|h| h.start)
        .unwrap_or(block.len());

    Some(normalization.finish(&block[from..to]))
}

// ── Tests ──
