use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{json_kind, Diagnostic, PipelineError};
use crate::parser::sections::Normalization;
use crate::parser::EntryFields;
use crate::rules::{FieldRule, MergePolicy};

/// The externally owned record mapping (`"1"`..`"64"` → record object).
///
/// Records are only ever augmented: no key is added or removed, and fields
/// not touched by a rule are kept as they were, key order included.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct MergeStats {
    pub records_updated: usize,
    /// Writes per target field.
    pub writes: BTreeMap<String, usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MergeStats {
    fn note_write(&mut self, target: &str) {
        *self.writes.entry(target.to_string()).or_default() += 1;
    }
}

impl RecordStore {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| PipelineError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        match value {
            Value::Object(records) => Ok(RecordStore { records }),
            other => Err(PipelineError::UnexpectedRecordShape {
                found: json_kind(&other),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.records.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.records)
    }

    /// Record keys in ordinal order. Keys that are not ordinals are reported
    /// and left out.
    pub fn ordinal_keys(&self, diagnostics: &mut Vec<Diagnostic>) -> Vec<(u32, String)> {
        let mut keys = Vec::with_capacity(self.records.len());
        for key in self.records.keys() {
            match key.trim().parse::<u32>() {
                Ok(n) => keys.push((n, key.clone())),
                Err(_) => {
                    warn!("record key {:?} is not an ordinal, skipped", key);
                    diagnostics.push(Diagnostic::UnparsableRecordKey { key: key.clone() });
                }
            }
        }
        keys.sort_by_key(|(n, _)| *n);
        keys
    }

    /// Apply extracted fields to the records with matching ordinals.
    ///
    /// Entries without a record are dropped; records without an entry are
    /// left alone.
    pub fn merge(&mut self, entries: &BTreeMap<u32, EntryFields>, rules: &[FieldRule]) -> MergeStats {
        let mut stats = MergeStats::default();

        for (ordinal, key) in self.ordinal_keys(&mut stats.diagnostics) {
            let Some(fields) = entries.get(&ordinal) else {
                continue;
            };
            let updates: Vec<(&str, &str)> = rules
                .iter()
                .filter_map(|rule| {
                    let value = fields.get(&rule.target)?;
                    rule.policy.admits(value).then_some((rule.target.as_str(), value.as_str()))
                })
                .collect();
            self.apply(&key, &updates, &mut stats);
        }

        let dropped = entries
            .keys()
            .filter(|n| !self.records.keys().any(|k| k.trim().parse::<u32>().ok() == Some(**n)))
            .count();
        if dropped > 0 {
            debug!("{} extracted entries have no record and were dropped", dropped);
        }

        stats
    }

    /// Pair units with records by position (records in ordinal order).
    ///
    /// A length mismatch is reported and the shorter side bounds the pairing.
    pub fn merge_positional(&mut self, target: &str, units: &[String], policy: MergePolicy) -> MergeStats {
        let mut stats = MergeStats::default();
        let keys = self.ordinal_keys(&mut stats.diagnostics);

        if keys.len() != units.len() {
            let d = Diagnostic::CountMismatch {
                records: keys.len(),
                units: units.len(),
            };
            warn!("{}", d);
            stats.diagnostics.push(d);
        }

        for ((_, key), unit) in keys.iter().zip(units) {
            if policy.admits(unit) {
                self.apply(key, &[(target, unit.as_str())], &mut stats);
            }
        }
        stats
    }

    /// Rewrite every string in every record with `normalization`.
    pub fn flatten(&mut self, normalization: Normalization) -> usize {
        self.records
            .values_mut()
            .map(|v| flatten_value(v, normalization))
            .sum()
    }

    fn apply(&mut self, key: &str, updates: &[(&str, &str)], stats: &mut MergeStats) {
        if updates.is_empty() {
            return;
        }
        let Some(record) = self.records.get_mut(key) else {
            return;
        };
        let Value::Object(record) = record else {
            warn!("record {:?} is not an object, skipped", key);
            stats.diagnostics.push(Diagnostic::RecordNotObject { key: key.to_string() });
            return;
        };

        let mut touched = false;
        for (target, value) in updates {
            match write_field(record, target, value) {
                Ok(()) => {
                    stats.note_write(target);
                    touched = true;
                }
                Err(parent) => {
                    let d = Diagnostic::FieldParentNotObject {
                        key: key.to_string(),
                        parent,
                        target: target.to_string(),
                    };
                    warn!("{}", d);
                    stats.diagnostics.push(d);
                }
            }
        }
        if touched {
            stats.records_updated += 1;
        }
    }
}

/// Set a dotted `target` inside `record`, creating missing parent objects.
/// Fails with the offending parent path when a parent is not an object.
fn write_field(record: &mut Map<String, Value>, target: &str, value: &str) -> Result<(), String> {
    let mut segments: Vec<&str> = target.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return Err(target.to_string());
    };

    let mut current = record;
    for (depth, segment) in segments.iter().enumerate() {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match slot {
            Value::Object(map) => map,
            _ => return Err(segments[..=depth].join(".")),
        };
    }
    current.insert(leaf.to_string(), Value::String(value.to_string()));
    Ok(())
}

fn flatten_value(value: &mut Value, normalization: Normalization) -> usize {
    match value {
        Value::String(s) => {
            let collapsed = normalization.collapse(s);
            if collapsed != *s {
                *s = collapsed;
                1
            } else {
                0
            }
        }
        Value::Array(items) => items.iter_mut().map(|v| flatten_value(v, normalization)).sum(),
        Value::Object(map) => map.values_mut().map(|v| flatten_value(v, normalization)).sum(),
        _ => 0,
    }
}
