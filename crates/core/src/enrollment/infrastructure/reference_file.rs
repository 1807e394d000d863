//! Export and import of descriptor sets as JSON files.
//!
//! Export writes an array of numeric arrays. Import is lenient about shape:
//! the top level may be an array or an object, and each entry may be a
//! numeric array or an index-keyed object of numbers (the form typed arrays
//! take when serialized). Bad entries are dropped with a warning; the file
//! only fails as a whole when nothing valid remains.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::enrollment::domain::descriptor_sets::{EnrollmentSet, ReferenceSet};
use crate::shared::descriptor::FaceDescriptor;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read reference file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reference file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reference file must contain an array or an object, found {0}")]
    UnsupportedShape(&'static str),
    #[error("reference file has no valid descriptors ({dropped} entries dropped)")]
    NoValidEntries { dropped: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DroppedEntry {
    pub key: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportReport {
    pub reference: ReferenceSet,
    pub dropped: Vec<DroppedEntry>,
}

/// A finalized enrollment ready to be saved under a file name.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceArtifact {
    file_name: String,
    contents: String,
}

impl ReferenceArtifact {
    pub fn from_set(set: &EnrollmentSet, file_name: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            file_name: file_name.to_string(),
            contents: serde_json::to_string_pretty(set.descriptors())?,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Writes the artifact into `dir`, creating it if needed.
    pub fn save_in(&self, dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.contents)?;
        log::info!("Reference set written to {}", path.display());
        Ok(path)
    }
}

pub fn load_reference(path: &Path) -> Result<ImportReport, ImportError> {
    let json = fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_reference(&json)
}

pub fn parse_reference(json: &str) -> Result<ImportReport, ImportError> {
    let root: Value = serde_json::from_str(json)?;
    let entries: Vec<(String, &Value)> = match &root {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        Value::Object(map) => ordered_entries(map),
        other => return Err(ImportError::UnsupportedShape(kind_of(other))),
    };

    let mut descriptors = Vec::with_capacity(entries.len());
    let mut dropped = Vec::new();
    for (key, value) in entries {
        match parse_descriptor(value) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(reason) => {
                log::warn!("Dropping reference entry {key}: {reason}");
                dropped.push(DroppedEntry { key, reason });
            }
        }
    }

    if descriptors.is_empty() {
        return Err(ImportError::NoValidEntries {
            dropped: dropped.len(),
        });
    }
    if let Some(first) = descriptors.first() {
        let expected = first.len();
        let odd = descriptors.iter().filter(|d| d.len() != expected).count();
        if odd > 0 {
            log::warn!(
                "{odd} reference entries differ from length {expected}; they will never match"
            );
        }
    }

    Ok(ImportReport {
        reference: ReferenceSet::new(descriptors),
        dropped,
    })
}

fn parse_descriptor(value: &Value) -> Result<FaceDescriptor, String> {
    let values: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => ordered_entries(map).into_iter().map(|(_, v)| v).collect(),
        other => return Err(format!("expected an array or object, found {}", kind_of(other))),
    };
    if values.is_empty() {
        return Err("descriptor is empty".into());
    }

    let mut numbers = Vec::with_capacity(values.len());
    for (i, v) in values.into_iter().enumerate() {
        let n = v
            .as_f64()
            .ok_or_else(|| format!("component {i} is {}, not a number", kind_of(v)))?;
        let n = n as f32;
        if !n.is_finite() {
            return Err(format!("component {i} is out of range"));
        }
        numbers.push(n);
    }
    Ok(FaceDescriptor::new(numbers))
}

/// Object entries sorted by numeric key when every key is an index,
/// otherwise in map order.
fn ordered_entries(map: &Map<String, Value>) -> Vec<(String, &Value)> {
    let indexed: Option<Vec<(usize, &Value)>> = map
        .iter()
        .map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
        .collect();
    match indexed {
        Some(mut entries) => {
            entries.sort_by_key(|(i, _)| *i);
            entries.into_iter().map(|(i, v)| (i.to_string(), v)).collect()
        }
        None => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
