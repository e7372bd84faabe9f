//! Structural transcoding between nested form state and flat multipart fields
//!
//! Client direction: a [`FormValue`] tree is flattened into bracket-keyed
//! entries, preceded by a JSON snapshot of the whole tree.
//!
//! Server direction: the snapshot is used verbatim when it is usable;
//! otherwise the flat text fields are rebuilt into a nested JSON tree by
//! walking each field's key path and coercing the leaf.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::coerce::{coerce, RawValue};
use crate::form_value::{FileBlob, FormValue};
use crate::keypath::parse_key_path;

/// Field carrying the JSON snapshot of the whole form
pub const SNAPSHOT_FIELD: &str = "formData";

/// Field used for a bare top-level scalar (no accumulated key)
pub const FALLBACK_FIELD: &str = "formData";

// ============================================================================
// Server direction (flat → nested)
// ============================================================================

/// Text fields of a multipart request, in receipt order
///
/// A name received more than once collects every value, the way urlencoded
/// body parsers turn repeated keys into arrays.
#[derive(Debug, Clone, Default)]
pub struct FlatFields {
    fields: Vec<(String, Vec<String>)>,
    /// Position of each name in `fields`
    index: HashMap<String, usize>,
}

impl FlatFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.index.get(&name) {
            Some(&pos) => self.fields[pos].1.push(value),
            None => {
                self.index.insert(name.clone(), self.fields.len());
                self.fields.push((name, vec![value]));
            }
        }
    }

    /// First value received under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .and_then(|&pos| self.fields[pos].1.first())
            .map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn raw_values(&self) -> impl Iterator<Item = (&str, RawValue)> {
        self.fields.iter().map(|(name, values)| {
            let raw = match values.as_slice() {
                [single] => RawValue::Text(single.clone()),
                many => RawValue::Structured(Value::Array(
                    many.iter().cloned().map(Value::String).collect(),
                )),
            };
            (name.as_str(), raw)
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FlatFields::new();
        for (name, value) in iter {
            fields.push(name, value);
        }
        fields
    }
}

/// How the nested record was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionSource {
    /// The `formData` snapshot was used verbatim
    Snapshot,
    /// Rebuilt from individual flat fields
    FlatFields,
}

/// An intermediate path segment that held a scalar and was replaced by a map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConflict {
    /// Flat field whose path forced the overwrite
    pub field: String,
    /// Path (joined with '.') of the overwritten segment
    pub path: String,
}

/// A nested record rebuilt from a flat request
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub record: Map<String, Value>,
    pub source: ReconstructionSource,
    pub conflicts: Vec<KeyConflict>,
}

/// Rebuild the nested record for a request
///
/// A snapshot that parses to a non-empty JSON object wins; anything else
/// falls back to flat-key reconstruction. Snapshot failures are never
/// surfaced to the caller.
pub fn reconstruct(fields: &FlatFields) -> Reconstruction {
    if let Some(snapshot) = fields.get(SNAPSHOT_FIELD) {
        match serde_json::from_str::<Value>(snapshot) {
            Ok(Value::Object(record)) if !record.is_empty() => {
                return Reconstruction {
                    record,
                    source: ReconstructionSource::Snapshot,
                    conflicts: Vec::new(),
                };
            }
            Ok(_) => warn!("formData snapshot is not a populated object - falling back to flat fields"),
            Err(e) => warn!(error = %e, "formData JSON parse failed - falling back to flat fields"),
        }
    }

    let (record, conflicts) = unflatten(fields);
    Reconstruction {
        record,
        source: ReconstructionSource::FlatFields,
        conflicts,
    }
}

/// Rebuild a nested record from flat fields alone
///
/// Intermediate segments holding a non-map are overwritten with a fresh map;
/// every such overwrite is logged and reported. Maps whose keys are exactly
/// `"0".."n-1"` become lists once all fields are placed.
pub fn unflatten(fields: &FlatFields) -> (Map<String, Value>, Vec<KeyConflict>) {
    let mut root = Map::new();
    let mut conflicts = Vec::new();

    for (name, raw) in fields.raw_values() {
        let path = parse_key_path(name);
        if path.is_empty() {
            continue;
        }
        place(&mut root, name, &path, 0, coerce(raw), &mut conflicts);
    }

    let root = root
        .into_iter()
        .map(|(key, value)| (key, densify_lists(value)))
        .collect();
    (root, conflicts)
}

fn place(
    node: &mut Map<String, Value>,
    field: &str,
    path: &[String],
    depth: usize,
    value: Value,
    conflicts: &mut Vec<KeyConflict>,
) {
    let segment = path[depth].clone();
    if depth + 1 == path.len() {
        node.insert(segment, value);
        return;
    }

    let slot = node.entry(segment).or_insert(Value::Null);
    if !slot.is_object() {
        if !slot.is_null() {
            let conflict = KeyConflict {
                field: field.to_string(),
                path: path[..=depth].join("."),
            };
            warn!(field = %conflict.field, path = %conflict.path, "Overwriting scalar with nested object");
            conflicts.push(conflict);
        }
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(child) = slot {
        place(child, field, path, depth + 1, value, conflicts);
    }
}

/// Turn index-keyed maps back into lists, recursively
fn densify_lists(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, densify_lists(value)))
                .collect();
            if is_dense_index_map(&map) {
                let mut items: Vec<(usize, Value)> = map
                    .into_iter()
                    .filter_map(|(key, value)| key.parse::<usize>().ok().map(|i| (i, value)))
                    .collect();
                items.sort_by_key(|(index, _)| *index);
                Value::Array(items.into_iter().map(|(_, value)| value).collect())
            } else {
                Value::Object(map)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(densify_lists).collect()),
        other => other,
    }
}

fn is_dense_index_map(map: &Map<String, Value>) -> bool {
    if map.is_empty() {
        return false;
    }
    let mut seen = vec![false; map.len()];
    for key in map.keys() {
        // Canonical indices only: "01" or "+1" stay map keys
        let canonical = key == "0" || (!key.starts_with('0') && key.bytes().all(|b| b.is_ascii_digit()));
        match key.parse::<usize>() {
            Ok(index) if canonical && index < seen.len() && !seen[index] => seen[index] = true,
            _ => return false,
        }
    }
    true
}

// ============================================================================
// Client direction (nested → flat)
// ============================================================================

/// Payload of one flat multipart entry
#[derive(Debug, Clone, PartialEq)]
pub enum FlatContent {
    Text(String),
    File(FileBlob),
}

/// One multipart entry produced by flattening
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry {
    pub name: String,
    pub content: FlatContent,
}

impl FlatEntry {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: FlatContent::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, file: FileBlob) -> Self {
        Self {
            name: name.into(),
            content: FlatContent::File(file),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            FlatContent::Text(text) => Some(text),
            FlatContent::File(_) => None,
        }
    }
}

/// Flatten a form tree into bracket-keyed entries
///
/// Maps recurse as `parent[child]`, lists as `parent[i]`; null leaves are
/// skipped. A scalar reached with no accumulated key goes under
/// [`FALLBACK_FIELD`].
pub fn flatten(value: &FormValue) -> Vec<FlatEntry> {
    let mut entries = Vec::new();
    append_entries(&mut entries, value, "");
    entries
}

fn append_entries(entries: &mut Vec<FlatEntry>, value: &FormValue, parent_key: &str) {
    match value {
        FormValue::Null => {}
        FormValue::File(file) => entries.push(FlatEntry::file(parent_key, file.clone())),
        FormValue::List(items) => {
            for (index, item) in items.iter().enumerate() {
                append_entries(entries, item, &child_key(parent_key, &index.to_string()));
            }
        }
        FormValue::Map(map) => {
            for (key, item) in map.iter() {
                append_entries(entries, item, &child_key(parent_key, key));
            }
        }
        scalar => {
            let Some(text) = scalar.scalar_text() else {
                return;
            };
            let name = if parent_key.is_empty() { FALLBACK_FIELD } else { parent_key };
            entries.push(FlatEntry::text(name, text));
        }
    }
}

fn child_key(parent_key: &str, key: &str) -> String {
    if parent_key.is_empty() {
        key.to_string()
    } else {
        format!("{parent_key}[{key}]")
    }
}

/// Encode a whole form for submission: snapshot first, then every leaf
pub fn encode_submission(state: &FormValue) -> Vec<FlatEntry> {
    let mut entries = vec![FlatEntry::text(SNAPSHOT_FIELD, state.to_snapshot().to_string())];
    entries.extend(flatten(state));
    entries
}
