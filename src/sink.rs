use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::PipelineError;
use crate::parser::line6::Line6Unit;

/// Pretty JSON: two-space indent, non-ASCII written literally.
pub fn render_json(value: &Value) -> String {
    // Serialising a `Value` to a string cannot fail.
    let mut out = serde_json::to_string_pretty(value).unwrap_or_default();
    out.push('\n');
    out
}

/// One `--- Excerpt N ---` section per unit, numbered from 1.
pub fn render_excerpts(units: &[Line6Unit]) -> String {
    let mut out = String::new();
    for (i, unit) in units.iter().enumerate() {
        out.push_str(&format!("--- Excerpt {} ---\n", i + 1));
        out.push_str(&unit.lead);
        out.push('\n');
        out.push_str(&unit.text);
        out.push_str("\n\n");
    }
    out
}

pub fn write_json(path: &Path, value: &Value) -> Result<(), PipelineError> {
    write_atomic(path, render_json(value).as_bytes())
}

/// Write through a temp file in the destination directory, then rename over
/// `path`. On any failure the previous file at `path` is left as it was.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| PipelineError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| PipelineError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| PipelineError::io(path, e.error))?;
    Ok(())
}
