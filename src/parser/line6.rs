//! Top-line commentary, found by a phrase that recurs once per entry.
//!
//! This does not use block splitting: units are paired with entries purely by
//! position, so it is only correct when the phrase occurs once per entry and
//! in entry order.

use super::blocks::is_heading;
use super::markers::contains_marker;
use super::sections::Normalization;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line6Unit {
    /// The line the phrase was found on, trimmed.
    pub lead: String,
    /// Commentary from the next line up to the next heading.
    pub text: String,
}

pub fn extract_line6(document: &str, phrase: &str, normalization: Normalization) -> Vec<Line6Unit> {
    let lines: Vec<&str> = document.lines().collect();
    let mut units = Vec::new();
    // Start line of a match that found no heading after it. Only the last
    // such match survives, as a single trailing unit.
    let mut trailing: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        if !contains_marker(line, phrase) {
            continue;
        }
        let start = i + 1;
        match lines[start..].iter().position(|l| is_heading(l)) {
            Some(len) => {
                units.push(unit(line, &lines[start..start + len], normalization));
                trailing = None;
            }
            None => trailing = Some(i),
        }
    }

    if let Some(i) = trailing {
        units.push(unit(lines[i], &lines[i + 1..], normalization));
    }

    units
}

fn unit(lead: &str, body: &[&str], normalization: Normalization) -> Line6Unit {
    Line6Unit {
        lead: normalization.finish(lead),
        text: normalization.finish(&body.join("\n")),
    }
}
