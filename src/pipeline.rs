//! Command runs: read inputs once, transform in memory, write once at the end.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{Diagnostic, PipelineError};
use crate::parser::{self, blocks, line6, sections::Normalization, titles};
use crate::records::{MergeStats, RecordStore};
use crate::rules::FieldSource;
use crate::sink;

#[derive(Debug, Default)]
pub struct RunReport {
    pub blocks: usize,
    pub entries: usize,
    pub records: usize,
    pub records_updated: usize,
    pub writes: BTreeMap<String, usize>,
    pub diagnostics: Vec<Diagnostic>,
    pub output: Option<PathBuf>,
}

impl RunReport {
    fn absorb(&mut self, stats: MergeStats) {
        self.records_updated += stats.records_updated;
        for (target, n) in stats.writes {
            *self.writes.entry(target).or_default() += n;
        }
        self.diagnostics.extend(stats.diagnostics);
    }

    pub fn print(&self) {
        println!(
            "Extracted {} entries from {} blocks; updated {} of {} records.",
            self.entries, self.blocks, self.records_updated, self.records
        );
        for (target, n) in &self.writes {
            println!("  {:<12} {}", target, n);
        }
        let mismatches = self
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::CountMismatch { .. }))
            .count();
        if mismatches > 0 {
            println!("WARNING: extracted units and records do not line up, see log.");
        }
        if !self.diagnostics.is_empty() {
            println!("{} diagnostics (RUST_LOG=debug for details).", self.diagnostics.len());
        }
        if let Some(path) = &self.output {
            println!("Saved: {}", path.display());
        }
    }
}

/// Read a source document, normalising line endings.
pub fn read_document(path: &Path) -> Result<String, PipelineError> {
    let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(raw.replace("\r\n", "\n"))
}

/// Split, extract the configured fields and merge them into the records.
pub fn merge_sections(document: &str, store: &mut RecordStore, cfg: &PipelineConfig) -> RunReport {
    let extraction = parser::extract_document(document, &cfg.rules, cfg.normalization);
    if extraction.blocks == 0 {
        warn!("no entry headings found in the document");
    }

    let mut report = RunReport {
        blocks: extraction.blocks,
        entries: extraction.entries.len(),
        records: store.len(),
        diagnostics: extraction.diagnostics,
        ..Default::default()
    };
    if report.entries != report.records {
        warn!(
            entries = report.entries,
            records = report.records,
            "entry count differs from record count"
        );
    }
    report.absorb(store.merge(&extraction.entries, &cfg.rules));
    report
}

/// Extract the recurring-phrase units and pair them with records by position.
pub fn merge_line6(document: &str, store: &mut RecordStore, cfg: &PipelineConfig) -> RunReport {
    let units: Vec<String> = line6::extract_line6(document, &cfg.line6_phrase, cfg.normalization)
        .into_iter()
        .map(|u| u.text)
        .collect();
    info!("extracted {} paragraphs for line 6", units.len());

    let mut report = RunReport {
        blocks: blocks::count_headings(document),
        entries: units.len(),
        records: store.len(),
        ..Default::default()
    };
    report.absorb(store.merge_positional(&cfg.line6_target, &units, cfg.line6_policy));
    report
}

pub fn run_merge(cfg: &PipelineConfig) -> Result<RunReport, PipelineError> {
    let output = cfg.output()?;
    let document = read_document(cfg.document()?)?;
    let mut store = RecordStore::load(cfg.records()?)?;

    let mut report = merge_sections(&document, &mut store, cfg);
    sink::write_json(output, &store.into_value())?;
    info!("wrote {}", output.display());
    report.output = Some(output.to_path_buf());
    Ok(report)
}

pub fn run_line6(cfg: &PipelineConfig) -> Result<RunReport, PipelineError> {
    let output = cfg.output()?;
    let document = read_document(cfg.document()?)?;
    let mut store = RecordStore::load(cfg.records()?)?;

    let mut report = merge_line6(&document, &mut store, cfg);
    sink::write_json(output, &store.into_value())?;
    info!("wrote {}", output.display());
    report.output = Some(output.to_path_buf());
    Ok(report)
}

/// Dump every line-6 unit to a plain text file.
pub fn run_excerpts(cfg: &PipelineConfig) -> Result<usize, PipelineError> {
    let output = cfg.output()?;
    let document = read_document(cfg.document()?)?;
    let units = line6::extract_line6(&document, &cfg.line6_phrase, cfg.normalization);
    sink::write_atomic(output, sink::render_excerpts(&units).as_bytes())?;
    info!("wrote {} excerpts to {}", units.len(), output.display());
    Ok(units.len())
}

/// Rewrite every string in the record file with `mode`.
pub fn run_flatten(cfg: &PipelineConfig, mode: Normalization) -> Result<usize, PipelineError> {
    let output = cfg.output()?;
    let mut store = RecordStore::load(cfg.records()?)?;
    let changed = store.flatten(mode);
    sink::write_json(output, &store.into_value())?;
    info!("flattened {} strings into {}", changed, output.display());
    Ok(changed)
}

#[derive(Debug)]
pub struct EntrySummary {
    pub ordinal: u32,
    pub title: String,
    /// (target, found non-empty) per configured section rule.
    pub sections: Vec<(String, bool)>,
}

#[derive(Debug)]
pub struct DocumentStats {
    pub heading_lines: usize,
    pub distinct_titles: usize,
    pub blocks: usize,
    pub line6_units: usize,
    pub entries: Vec<EntrySummary>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn document_stats(document: &str, cfg: &PipelineConfig) -> DocumentStats {
    let extraction = parser::extract_document(document, &cfg.rules, cfg.normalization);
    let section_targets: Vec<&str> = cfg
        .rules
        .iter()
        .filter(|r| matches!(r.source, FieldSource::Section { .. }))
        .map(|r| r.target.as_str())
        .collect();

    let entries = titles::scan_titles(document)
        .into_iter()
        .map(|t| {
            let fields = extraction.entries.get(&t.ordinal);
            let sections = section_targets
                .iter()
                .map(|target| {
                    let found = fields
                        .and_then(|f| f.get(*target))
                        .is_some_and(|v| !v.is_empty());
                    (target.to_string(), found)
                })
                .collect();
            EntrySummary {
                ordinal: t.ordinal,
                title: t.text,
                sections,
            }
        })
        .collect::<Vec<_>>();

    DocumentStats {
        heading_lines: blocks::count_headings(document),
        distinct_titles: entries.len(),
        blocks: extraction.blocks,
        line6_units: line6::extract_line6(document, &cfg.line6_phrase, cfg.normalization).len(),
        entries,
        diagnostics: extraction.diagnostics,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::rules::{Language, Preset};
    use serde_json::json;

    fn en_config() -> PipelineConfig {
        Settings::default().resolve()
    }

    #[test]
    fn end_to_end_scenario() {
        let doc = "1. Foo\nTHE JUDGMENT\nJudgment text.\nTHE IMAGE\nImage text.\nINDIVIDUAL LINES\nignored\n2. Bar\n...";
        let mut store = RecordStore::from_value(json!({
            "1": {"title": "", "judgment": "", "image": "", "lines": {}}
        }))
        .unwrap();
        let report = merge_sections(doc, &mut store, &en_config());
        assert_eq!(
            store.into_value(),
            json!({"1": {"title": "1. Foo", "judgment": "Judgment text.", "image": "Image text.", "lines": {}}})
        );
        assert_eq!(report.records_updated, 1);
        assert_eq!(report.blocks, 2);
    }

    #[test]
    fn english_fixture_merge() {
        let doc = read_document(Path::new("tests/fixtures/sample_en.txt")).unwrap();
        let mut store = RecordStore::load(Path::new("tests/fixtures/records.json")).unwrap();
        let report = merge_sections(&doc, &mut store, &en_config());
        let out = store.into_value();

        assert_eq!(out["1"]["title"], "1. Ch'ien / The Creative");
        assert_eq!(
            out["1"]["judgment"],
            "The Creative works sublime success,\nFurthering through perseverance."
        );
        assert_eq!(out["1"]["image"], "The movement of heaven is full of power.");
        assert_eq!(out["1"]["trigrams"]["upper"], "heaven");

        // no end marker: the judgment runs to the end of the block
        assert_eq!(
            out["2"]["judgment"],
            "The Receptive brings about sublime success.\n\nSix at the top above means:\nDragons fight in the meadow."
        );
        // no image section: existing value survives
        assert_eq!(out["2"]["image"], "kept image");
        // no judgment section: existing value survives
        assert_eq!(out["3"]["judgment"], "kept three");
        assert_eq!(
            out["3"]["image"],
            "Clouds and thunder:\nThe image of Difficulty at the Beginning."
        );

        assert_eq!(report.writes.get("title"), Some(&3));
        assert_eq!(report.writes.get("judgment"), Some(&2));
        assert_eq!(report.writes.get("image"), Some(&2));
    }

    #[test]
    fn english_fixture_line6() {
        let doc = read_document(Path::new("tests/fixtures/sample_en.txt")).unwrap();
        let mut store = RecordStore::load(Path::new("tests/fixtures/records.json")).unwrap();
        let report = merge_line6(&doc, &mut store, &en_config());
        let out = store.into_value();

        assert!(report.diagnostics.is_empty());
        assert_eq!(out["1"]["lines"]["6"], "Arrogant dragon will have cause to repent.");
        assert_eq!(out["2"]["lines"]["6"], "Dragons fight in the meadow.");
        assert_eq!(out["2"]["lines"]["1"], "first line");
        assert_eq!(out["3"]["lines"]["6"], "Horse and wagon part.");
    }

    #[test]
    fn line6_count_mismatch_is_reported() {
        let doc = "1. A\nx above means:\none\n2. B\nno phrase here\n";
        let mut store = RecordStore::from_value(json!({"1": {"lines": {}}, "2": {"lines": {}}})).unwrap();
        let report = merge_line6(doc, &mut store, &en_config());
        assert_eq!(report.diagnostics, vec![Diagnostic::CountMismatch { records: 2, units: 1 }]);
        let out = store.into_value();
        assert_eq!(out["1"]["lines"]["6"], "one");
        assert_eq!(out["2"]["lines"], json!({}));
    }

    #[test]
    fn run_merge_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("hexagrams_updated.json");
        let cfg = PipelineConfig {
            document: Some("tests/fixtures/sample_it.txt".into()),
            records: Some("tests/fixtures/records.json".into()),
            output: Some(output.clone()),
            ..Settings {
                language: Language::It,
                preset: Preset::TitleJudgment,
                ..Default::default()
            }
            .resolve()
        };
        let report = run_merge(&cfg).unwrap();
        assert_eq!(report.output.as_deref(), Some(output.as_path()));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["2"]["title"], "2. K\u{2019}un - Il Ricettivo");
        assert_eq!(written["2"]["image"], "kept image");
        assert_eq!(written["3"]["judgment"], "La difficolt\u{e0} iniziale opera sublime riuscita.");
        let keys: Vec<&String> = written.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["1", "2", "3"]);
    }

    #[test]
    fn bad_record_shape_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records.json");
        let output = dir.path().join("out.json");
        std::fs::write(&records, "[1, 2, 3]").unwrap();
        std::fs::write(&output, "previous").unwrap();

        let cfg = PipelineConfig {
            document: Some("tests/fixtures/sample_en.txt".into()),
            records: Some(records),
            output: Some(output.clone()),
            ..en_config()
        };
        let err = run_line6(&cfg).unwrap_err();
        assert!(matches!(err, PipelineError::UnexpectedRecordShape { .. }));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous");
    }

    #[test]
    fn missing_document_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let cfg = PipelineConfig {
            document: Some(dir.path().join("absent.txt")),
            records: Some("tests/fixtures/records.json".into()),
            output: Some(output.clone()),
            ..en_config()
        };
        assert!(matches!(run_merge(&cfg), Err(PipelineError::Io { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn excerpts_and_flatten() {
        let dir = tempfile::tempdir().unwrap();
        let excerpts = dir.path().join("riga6.txt");
        let cfg = PipelineConfig {
            document: Some("tests/fixtures/sample_it.txt".into()),
            output: Some(excerpts.clone()),
            ..Settings {
                language: Language::It,
                ..Default::default()
            }
            .resolve()
        };
        assert_eq!(run_excerpts(&cfg).unwrap(), 3);
        let text = std::fs::read_to_string(&excerpts).unwrap();
        assert!(text.starts_with("--- Excerpt 1 ---\nNove sopra significa:\nIl drago superbo"));

        let records = dir.path().join("records.json");
        std::fs::write(&records, r#"{"1": {"judgment": "a\n\n\nb"}}"#).unwrap();
        let flat = dir.path().join("flat.json");
        let cfg = PipelineConfig {
            records: Some(records),
            output: Some(flat.clone()),
            ..en_config()
        };
        assert_eq!(run_flatten(&cfg, Normalization::SingleNewline).unwrap(), 1);
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&flat).unwrap()).unwrap();
        assert_eq!(written["1"]["judgment"], "a\nb");
    }

    #[test]
    fn stats_over_fixture() {
        let doc = read_document(Path::new("tests/fixtures/sample_en.txt")).unwrap();
        let stats = document_stats(&doc, &en_config());
        assert_eq!(stats.heading_lines, 3);
        assert_eq!(stats.blocks, 3);
        assert_eq!(stats.distinct_titles, 3);
        assert_eq!(stats.line6_units, 3);
        assert_eq!(
            stats.entries[1].sections,
            vec![("judgment".to_string(), true), ("image".to_string(), false)]
        );
    }
}
