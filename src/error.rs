use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run. Nothing is written once one of these is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("record file must hold an object keyed by ordinal, found {found}")]
    UnexpectedRecordShape { found: &'static str },

    #[error("no {0} path configured (set it in the config file, the environment or on the command line)")]
    MissingPath(&'static str),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Recoverable conditions. The affected entry or field degrades to "no value"
/// and the run carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("heading line does not parse as an ordinal: {line:?}")]
    MalformedHeading { line: String },

    #[error("entry {ordinal}: marker {marker:?} not found")]
    MissingMarker { ordinal: u32, marker: String },

    #[error("positional mismatch: {records} records but {units} extracted units")]
    CountMismatch { records: usize, units: usize },

    #[error("entry {ordinal} appears more than once; the later block wins")]
    DuplicateOrdinal { ordinal: u32 },

    #[error("record key {key:?} is not an ordinal")]
    UnparsableRecordKey { key: String },

    #[error("record {key:?} is not an object")]
    RecordNotObject { key: String },

    #[error("record {key:?}: {parent:?} is not an object, cannot write {target:?}")]
    FieldParentNotObject {
        key: String,
        parent: String,
        target: String,
    },
}

pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
