//! Marker matching over a case- and quote-folded view of the text.
//!
//! Both the marker and the scanned text are folded the same way: letters are
//! lowercased and every apostrophe spelling (straight, curly, modifier letter,
//! or the UTF-8-read-as-cp1252 sequence `â€™`) becomes `'`. Matches are
//! reported as byte ranges into the *original* text so callers can slice it.

const APOSTROPHES: &[char] = &['\'', '\u{2019}', '\u{2018}', '\u{02BC}'];

/// Mis-decoded apostrophe sequences, matched before single characters.
const MOJIBAKE_APOSTROPHES: &[&str] = &["\u{E2}\u{20AC}\u{2122}", "\u{E2}\u{20AC}\u{2DC}"];

/// Mis-decoded punctuation and the character it was meant to be.
const MOJIBAKE_REPAIRS: &[(&str, &str)] = &[
    ("\u{E2}\u{20AC}\u{2122}", "\u{2019}"),
    ("\u{E2}\u{20AC}\u{2DC}", "\u{2018}"),
    ("\u{E2}\u{20AC}\u{153}", "\u{201C}"),
    ("\u{E2}\u{20AC}\u{9D}", "\u{201D}"),
    ("\u{E2}\u{20AC}\u{201C}", "\u{2013}"),
    ("\u{E2}\u{20AC}\u{201D}", "\u{2014}"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerHit {
    /// Index of the marker in the list passed to [`scan_markers`].
    pub marker: usize,
    pub start: usize,
    pub end: usize,
}

/// Folded copy of a text plus the unit boundaries needed to map offsets back.
struct Folded {
    text: String,
    /// (folded offset, original offset) at the start of every source unit,
    /// closed by a sentinel for the end of both strings.
    bounds: Vec<(usize, usize)>,
}

impl Folded {
    fn new(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut bounds = Vec::with_capacity(source.len() + 1);
        let mut i = 0;

        while i < source.len() {
            bounds.push((text.len(), i));
            let rest = &source[i..];

            if let Some(seq) = MOJIBAKE_APOSTROPHES.iter().find(|s| rest.starts_with(**s)) {
                text.push('\'');
                i += seq.len();
                continue;
            }

            let Some(c) = rest.chars().next() else { break };
            if APOSTROPHES.contains(&c) {
                text.push('\'');
            } else {
                text.extend(c.to_lowercase());
            }
            i += c.len_utf8();
        }

        bounds.push((text.len(), source.len()));
        Folded { text, bounds }
    }

    fn original(&self, folded: usize) -> Option<usize> {
        self.bounds
            .binary_search_by_key(&folded, |&(f, _)| f)
            .ok()
            .map(|idx| self.bounds[idx].1)
    }
}

/// Fold a marker into the form it is searched for.
pub fn fold(marker: &str) -> String {
    Folded::new(marker).text
}

/// All occurrences of any of `markers` in `text`, ordered by position.
///
/// Overlapping hits are resolved in favour of the one that starts first
/// (the longer one on a tie), so the result is a sequence of disjoint spans.
pub fn scan_markers(text: &str, markers: &[&str]) -> Vec<MarkerHit> {
    let folded = Folded::new(text);
    let mut hits = Vec::new();

    for (idx, marker) in markers.iter().enumerate() {
        let needle = fold(marker);
        if needle.is_empty() {
            continue;
        }
        for (pos, _) in folded.text.match_indices(needle.as_str()) {
            // A hit that does not line up with source units (e.g. inside a
            // multi-char lowercase expansion) is not a real occurrence.
            let (Some(start), Some(end)) =
                (folded.original(pos), folded.original(pos + needle.len()))
            else {
                continue;
            };
            hits.push(MarkerHit {
                marker: idx,
                start,
                end,
            });
        }
    }

    hits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut disjoint: Vec<MarkerHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        if disjoint.last().is_some_and(|prev| hit.start < prev.end) {
            continue;
        }
        disjoint.push(hit);
    }
    disjoint
}

pub fn contains_marker(text: &str, marker: &str) -> bool {
    !scan_markers(text, &[marker]).is_empty()
}

/// Replace mis-decoded quote and dash sequences with the intended characters.
pub fn repair_mojibake(text: &str) -> String {
    if !text.contains('\u{E2}') {
        return text.to_string();
    }
    MOJIBAKE_REPAIRS
        .iter()
        .fold(text.to_string(), |acc, (bad, good)| acc.replace(bad, good))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive() {
        let hits = scan_markers("intro\nThe Judgment\nbody", &["THE JUDGMENT"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].start, 6);
        assert_eq!(hits[0].end, 18);
    }

    #[test]
    fn apostrophe_spellings_all_match() {
        for text in [
            "L'IMMAGINE",
            "L\u{2019}IMMAGINE",
            "L\u{E2}\u{20AC}\u{2122}IMMAGINE",
            "l\u{2018}immagine",
        ] {
            let hits = scan_markers(text, &["L'IMMAGINE"]);
            assert_eq!(hits.len(), 1, "no match in {:?}", text);
            assert_eq!(hits[0].start, 0);
            assert_eq!(hits[0].end, text.len());
        }
    }

    #[test]
    fn marker_with_curly_quote_matches_straight_text() {
        assert!(contains_marker("L'IMMAGINE", "L\u{2019}IMMAGINE"));
    }

    #[test]
    fn offsets_point_into_original_text() {
        let text = "Ch\u{E2}\u{20AC}\u{2122}ien\nTHE IMAGE\nx";
        let hits = scan_markers(text, &["the image"]);
        assert_eq!(&text[hits[0].start..hits[0].end], "THE IMAGE");
    }

    #[test]
    fn hits_are_ordered_and_tagged() {
        let text = "THE JUDGMENT\na\nTHE IMAGE\nb\nTHE JUDGMENT";
        let hits = scan_markers(text, &["THE IMAGE", "THE JUDGMENT"]);
        let order: Vec<usize> = hits.iter().map(|h| h.marker).collect();
        assert_eq!(order, vec![1, 0, 1]);
    }

    #[test]
    fn overlapping_hits_keep_first() {
        let hits = scan_markers("THE IMAGES", &["THE IMAGE", "IMAGES"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].marker, 0);
    }

    #[test]
    fn empty_marker_never_matches() {
        assert!(scan_markers("anything", &[""]).is_empty());
    }

    #[test]
    fn repair() {
        assert_eq!(
            repair_mojibake("Ch\u{E2}\u{20AC}\u{2122}ien"),
            "Ch\u{2019}ien"
        );
        assert_eq!(repair_mojibake("plain text"), "plain text");
    }
}
