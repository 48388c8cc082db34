use std::sync::LazyLock;

use regex::Regex;

/// `<ordinal>. <label>` on a line of its own (surrounding whitespace ignored).
pub(crate) static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.+)$").unwrap());

/// Raw text of one entry, starting at its heading line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    /// The heading line, trimmed.
    pub heading: &'a str,
    /// Heading line included, up to the next heading or end of document.
    pub text: &'a str,
}

pub fn is_heading(line: &str) -> bool {
    HEADING_RE.is_match(line.trim())
}

/// Split a document into entry blocks.
///
/// Text before the first heading is dropped. A document without headings
/// yields no blocks.
pub fn split_blocks(document: &str) -> Vec<Block<'_>> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in document.split_inclusive('\n') {
        if is_heading(line) {
            starts.push(offset);
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(document.len());
            let text = &document[start..end];
            let heading = text.lines().next().unwrap_or_default().trim();
            Block { heading, text }
        })
        .collect()
}

/// Number of lines in `document` that qualify as headings.
pub fn count_headings(document: &str) -> usize {
    document.lines().filter(|l| is_heading(l)).count()
}
