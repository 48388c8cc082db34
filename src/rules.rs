use serde::Deserialize;

/// Whether an extracted value may overwrite what the record already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Overwrite whenever the entry produced a value, even an empty one.
    AlwaysReplace,
    /// Overwrite only with non-empty text.
    #[default]
    ReplaceIfNonempty,
}

impl MergePolicy {
    pub fn admits(self, value: &str) -> bool {
        match self {
            MergePolicy::AlwaysReplace => true,
            MergePolicy::ReplaceIfNonempty => !value.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// The entry's heading line.
    Title,
    /// Text between two markers inside the entry's block.
    Section { start: String, end: Option<String> },
}

/// One extracted field: where it comes from, where it goes, and how it merges.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct FieldRule {
    /// Dotted path inside a record, e.g. `judgment` or `lines.6`.
    pub target: String,
    pub source: FieldSource,
    pub policy: MergePolicy,
}

impl FieldRule {
    pub fn title(target: &str, policy: MergePolicy) -> Self {
        FieldRule {
            target: target.to_string(),
            source: FieldSource::Title,
            policy,
        }
    }

    pub fn section(target: &str, start: &str, end: Option<&str>, policy: MergePolicy) -> Self {
        FieldRule {
            target: target.to_string(),
            source: FieldSource::Section {
                start: start.to_string(),
                end: end.map(str::to_string),
            },
            policy,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum SourceKind {
    Title,
    Section,
}

/// Flat shape used in config files.
#[derive(Debug, Deserialize)]
struct RawRule {
    target: String,
    source: SourceKind,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    policy: MergePolicy,
}

impl TryFrom<RawRule> for FieldRule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        if raw.target.split('.').any(str::is_empty) {
            return Err(format!("invalid target path {:?}", raw.target));
        }
        let source = match raw.source {
            SourceKind::Title => FieldSource::Title,
            SourceKind::Section => {
                let start = raw
                    .start
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| format!("section rule for {:?} needs a start marker", raw.target))?;
                FieldSource::Section {
                    start,
                    end: raw.end.filter(|s| !s.trim().is_empty()),
                }
            }
        };
        Ok(FieldRule {
            target: raw.target,
            source,
            policy: raw.policy,
        })
    }
}

/// Literal markers of one edition of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
    pub judgment: &'static str,
    pub image: &'static str,
    pub lines: &'static str,
    pub line6: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    It,
}

impl Language {
    pub fn markers(self) -> MarkerSet {
        match self {
            Language::En => MarkerSet {
                judgment: "THE JUDGMENT",
                image: "THE IMAGE",
                lines: "INDIVIDUAL LINES",
                line6: "above means",
            },
            Language::It => MarkerSet {
                judgment: "LA SENTENZA",
                image: "L'IMMAGINE",
                lines: "LE SINGOLE LINEE",
                line6: "sopra significa",
            },
        }
    }
}

/// Named rule lists, one per kind of update run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    Titles,
    TitleJudgment,
    Image,
    #[default]
    TitleJudgmentImage,
}

impl Preset {
    pub fn rules(self, markers: &MarkerSet) -> Vec<FieldRule> {
        use MergePolicy::*;

        let judgment = || FieldRule::section("judgment", markers.judgment, Some(markers.image), ReplaceIfNonempty);
        let image = || FieldRule::section("image", markers.image, Some(markers.lines), ReplaceIfNonempty);

        match self {
            Preset::Titles => vec![FieldRule::title("title", AlwaysReplace)],
            Preset::TitleJudgment => vec![FieldRule::title("title", AlwaysReplace), judgment()],
            Preset::Image => vec![image()],
            Preset::TitleJudgmentImage => vec![FieldRule::title("title", ReplaceIfNonempty), judgment(), image()],
        }
    }
}
