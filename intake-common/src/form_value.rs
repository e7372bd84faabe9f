//! Client-side form state tree
//!
//! Unlike the server's JSON tree, in-progress form state can hold selected
//! files and dates. Both are flattened specially when the form is submitted.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

/// A file chosen for upload
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlob {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl FileBlob {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// Insertion-ordered string-keyed map of form values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormMap {
    entries: Vec<(String, FormValue)>,
}

impl FormMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FormValue> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or replace, keeping the original position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: FormValue) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FormValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FormValue)> for FormMap {
    fn from_iter<I: IntoIterator<Item = (K, FormValue)>>(iter: I) -> Self {
        let mut map = FormMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// One node of the form state tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
    File(FileBlob),
    List(Vec<FormValue>),
    Map(FormMap),
}

impl FormValue {
    pub fn empty_map() -> Self {
        FormValue::Map(FormMap::new())
    }

    pub fn as_map(&self) -> Option<&FormMap> {
        match self {
            FormValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut FormMap> {
        match self {
            FormValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FormValue]> {
        match self {
            FormValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Follow a segment path through nested maps
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&FormValue> {
        path.iter().try_fold(self, |node, segment| node.get(segment.as_ref()))
    }

    /// Set a value at a segment path, creating intermediate maps
    ///
    /// An intermediate node that is not a map is replaced by an empty one.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: FormValue) {
        let Some((head, rest)) = path.split_first() else {
            *self = value;
            return;
        };
        if !matches!(self, FormValue::Map(_)) {
            *self = FormValue::empty_map();
        }
        if let FormValue::Map(map) = self {
            let key = head.as_ref();
            if map.get(key).is_none() {
                map.insert(key, FormValue::Null);
            }
            if let Some(child) = map.get_mut(key) {
                if rest.is_empty() {
                    *child = value;
                } else {
                    child.set_path(rest, value);
                }
            }
        }
    }

    /// JavaScript-style truthiness, used by client-side required checks
    pub fn is_truthy(&self) -> bool {
        match self {
            FormValue::Null => false,
            FormValue::Bool(b) => *b,
            FormValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FormValue::Text(text) => !text.is_empty(),
            FormValue::Date(_) | FormValue::File(_) | FormValue::List(_) | FormValue::Map(_) => true,
        }
    }

    /// The string form a scalar takes in a flat transport
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            FormValue::Bool(b) => Some(b.to_string()),
            FormValue::Number(n) => Some(number_text(*n)),
            FormValue::Text(text) => Some(text.clone()),
            FormValue::Date(date) => Some(timestamp_text(date)),
            _ => None,
        }
    }

    /// JSON snapshot of the tree: file leaves become null, dates become text
    pub fn to_snapshot(&self) -> Value {
        match self {
            FormValue::Null | FormValue::File(_) => Value::Null,
            FormValue::Bool(b) => Value::Bool(*b),
            FormValue::Number(n) => number_json(*n),
            FormValue::Text(text) => Value::String(text.clone()),
            FormValue::Date(date) => Value::String(timestamp_text(date)),
            FormValue::List(items) => Value::Array(items.iter().map(FormValue::to_snapshot).collect()),
            FormValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.to_string(), value.to_snapshot()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Build a form tree from plain JSON
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FormValue::Null,
            Value::Bool(b) => FormValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(FormValue::Number).unwrap_or(FormValue::Null),
            Value::String(s) => FormValue::Text(s.clone()),
            Value::Array(items) => FormValue::List(items.iter().map(FormValue::from_json).collect()),
            Value::Object(map) => FormValue::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), FormValue::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        FormValue::Text(s.to_string())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        FormValue::Text(s)
    }
}

impl From<bool> for FormValue {
    fn from(b: bool) -> Self {
        FormValue::Bool(b)
    }
}

impl From<f64> for FormValue {
    fn from(n: f64) -> Self {
        FormValue::Number(n)
    }
}

impl From<i64> for FormValue {
    fn from(n: i64) -> Self {
        FormValue::Number(n as f64)
    }
}

impl From<FileBlob> for FormValue {
    fn from(file: FileBlob) -> Self {
        FormValue::File(file)
    }
}

impl From<DateTime<Utc>> for FormValue {
    fn from(date: DateTime<Utc>) -> Self {
        FormValue::Date(date)
    }
}

/// Canonical timestamp text (UTC, millisecond precision)
pub fn timestamp_text(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_integral(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15
}

fn number_text(n: f64) -> String {
    if is_integral(n) {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn number_json(n: f64) -> Value {
    if is_integral(n) {
        Value::Number((n as i64).into())
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}
