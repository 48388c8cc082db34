use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::PipelineError;
use crate::parser::sections::Normalization;
use crate::rules::{FieldRule, Language, MergePolicy, Preset};

const DEFAULT_CONFIG: &str = "hexagram_extract";
const ENV_PREFIX: &str = "HEXAGRAM";

/// Layered settings: config file, then `HEXAGRAM_*` variables, then CLI flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub document: Option<PathBuf>,
    pub records: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub language: Language,
    pub normalization: Normalization,
    pub preset: Preset,
    /// Replaces the preset when present.
    pub rules: Option<Vec<FieldRule>>,
    /// Overrides the language's recurring line-6 phrase.
    pub line6_phrase: Option<String>,
    pub line6_target: Option<String>,
    pub line6_policy: Option<MergePolicy>,
}

impl Settings {
    /// Load from `path` (required) or from `hexagram_extract.{toml,json,...}`
    /// in the working directory (optional), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn resolve(self) -> PipelineConfig {
        let markers = self.language.markers();
        let rules = self.rules.unwrap_or_else(|| self.preset.rules(&markers));
        PipelineConfig {
            document: self.document,
            records: self.records,
            output: self.output,
            line6_phrase: self.line6_phrase.unwrap_or_else(|| markers.line6.to_string()),
            line6_target: self.line6_target.unwrap_or_else(|| "lines.6".to_string()),
            line6_policy: self.line6_policy.unwrap_or(MergePolicy::AlwaysReplace),
            rules,
            normalization: self.normalization,
        }
    }
}

/// Everything a pipeline run needs, passed explicitly into each command.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub document: Option<PathBuf>,
    pub records: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub rules: Vec<FieldRule>,
    pub normalization: Normalization,
    pub line6_phrase: String,
    pub line6_target: String,
    pub line6_policy: MergePolicy,
}

impl PipelineConfig {
    pub fn document(&self) -> Result<&Path, PipelineError> {
        self.document.as_deref().ok_or(PipelineError::MissingPath("document"))
    }

    pub fn records(&self) -> Result<&Path, PipelineError> {
        self.records.as_deref().ok_or(PipelineError::MissingPath("records"))
    }

    pub fn output(&self) -> Result<&Path, PipelineError> {
        self.output.as_deref().ok_or(PipelineError::MissingPath("output"))
    }
}
