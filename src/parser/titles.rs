use crate::error::Diagnostic;

use super::blocks::HEADING_RE;
use super::markers::repair_mojibake;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub ordinal: u32,
    /// Full heading line, ordinal prefix included.
    pub text: String,
}

/// Parse a single line as an entry heading.
pub fn parse_heading(line: &str) -> Result<Title, Diagnostic> {
    let line = line.trim();
    let malformed = || Diagnostic::MalformedHeading {
        line: line.to_string(),
    };
    let caps = HEADING_RE.captures(line).ok_or_else(malformed)?;
    let ordinal = caps[1].parse::<u32>().map_err(|_| malformed())?;
    if ordinal == 0 {
        return Err(malformed());
    }
    Ok(Title {
        ordinal,
        text: repair_mojibake(&caps[0]),
    })
}

/// Title of a block: its first non-blank line, if that line is a heading.
pub fn title_of(block: &str) -> Result<Title, Diagnostic> {
    let first = block.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    parse_heading(first)
}

/// Line-by-line title scan, independent of block splitting.
///
/// Later headings with the same ordinal replace earlier ones.
pub fn scan_titles(document: &str) -> Vec<Title> {
    let mut titles: Vec<Title> = Vec::new();
    for title in document.lines().filter_map(|l| parse_heading(l).ok()) {
        match titles.iter_mut().find(|t| t.ordinal == title.ordinal) {
            Some(existing) => *existing = title,
            None => titles.push(title),
        }
    }
    titles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_line_is_title() {
        let t = title_of("1. Ch'ien / The Creative\nTHE JUDGMENT\n").unwrap();
        assert_eq!(t.ordinal, 1);
        assert_eq!(t.text, "1. Ch'ien / The Creative");
    }

    #[test]
    fn leading_blank_lines_skipped() {
        let t = title_of("\n\n  12. P'i / Standstill  \nbody").unwrap();
        assert_eq!(t.ordinal, 12);
        assert_eq!(t.text, "12. P'i / Standstill");
    }

    #[test]
    fn non_heading_first_line() {
        let err = title_of("Preface\n1. Foo").unwrap_err();
        assert!(matches!(err, Diagnostic::MalformedHeading { line } if line == "Preface"));
    }

    #[test]
    fn ordinal_overflow_is_malformed() {
        assert!(parse_heading("99999999999999. Too big").is_err());
        assert!(parse_heading("0. Zero").is_err());
    }

    #[test]
    fn mojibake_repaired_in_title() {
        let t = parse_heading("1. Ch\u{E2}\u{20AC}\u{2122}ien - Il Creativo").unwrap();
        assert_eq!(t.text, "1. Ch\u{2019}ien - Il Creativo");
    }

    #[test]
    fn scan_keeps_document_order() {
        let titles = scan_titles("intro\n2. Two\nx\n1. One\n2. Two again\n");
        let got: Vec<(u32, &str)> = titles.iter().map(|t| (t.ordinal, t.text.as_str())).collect();
        assert_eq!(got, vec![(2, "2. Two again"), (1, "1. One")]);
    }
}
