//! The `Annotation Notes` map stored on each task record.
//!
//! Keys are `{taskNumber}_{sectionIndex}_{fieldName}`. Values are written as
//! `{ value, timestamp }`; bare scalars from older rows are still readable.

use crate::error::{Result, StepnoteError};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// AnnotationKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationKey {
    pub task_number: String,
    pub section: usize,
    pub field: String,
}

impl AnnotationKey {
    pub fn new(task_number: impl Into<String>, section: usize, field: impl Into<String>) -> Self {
        AnnotationKey {
            task_number: task_number.into(),
            section,
            field: field.into(),
        }
    }

    /// Prefix shared by every key of one section, e.g. `42_3_`.
    pub fn section_prefix(task_number: &str, section: usize) -> String {
        format!("{task_number}_{section}_")
    }
}

impl fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.task_number, self.section, self.field)
    }
}

impl FromStr for AnnotationKey {
    type Err = StepnoteError;

    /// Splits from the right: field names never contain `_`, task numbers may.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || StepnoteError::InvalidAnnotationKey(s.to_string());
        let mut parts = s.rsplitn(3, '_');
        let field = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let section = parts
            .next()
            .and_then(|p| p.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .ok_or_else(invalid)?;
        let task = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        Ok(AnnotationKey::new(task, section, field))
    }
}

// ---------------------------------------------------------------------------
// NoteScalar / NoteValue
// ---------------------------------------------------------------------------

/// The logical value of one annotation field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteScalar {
    Flag(bool),
    Text(String),
    List(Vec<String>),
    /// `{ "tag": true, ... }` selection maps written by earlier clients.
    Selection(BTreeMap<String, bool>),
}

impl NoteScalar {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NoteScalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Selected tags, whether stored as a list or a selection map.
    pub fn as_tags(&self) -> Vec<String> {
        match self {
            NoteScalar::List(items) => items.clone(),
            NoteScalar::Selection(map) => map
                .iter()
                .filter(|(_, on)| **on)
                .map(|(tag, _)| tag.clone())
                .collect(),
            NoteScalar::Text(s) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

impl From<&str> for NoteScalar {
    fn from(s: &str) -> Self {
        NoteScalar::Text(s.to_string())
    }
}

impl From<String> for NoteScalar {
    fn from(s: String) -> Self {
        NoteScalar::Text(s)
    }
}

impl From<bool> for NoteScalar {
    fn from(b: bool) -> Self {
        NoteScalar::Flag(b)
    }
}

impl From<Vec<String>> for NoteScalar {
    fn from(items: Vec<String>) -> Self {
        NoteScalar::List(items)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteValue {
    Timestamped { value: NoteScalar, timestamp: String },
    Raw(NoteScalar),
    /// Anything else found in the stored map. Kept so a rewrite of the field
    /// does not drop it.
    Unrecognized(Value),
}

impl NoteValue {
    /// Wrap `value` with the current UTC time.
    pub fn now(value: impl Into<NoteScalar>) -> Self {
        NoteValue::Timestamped {
            value: value.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn scalar(&self) -> Option<&NoteScalar> {
        match self {
            NoteValue::Timestamped { value, .. } | NoteValue::Raw(value) => Some(value),
            NoteValue::Unrecognized(_) => None,
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        match self {
            NoteValue::Timestamped { timestamp, .. } => Some(timestamp),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AnnotationNotes
// ---------------------------------------------------------------------------

/// Field name → value for a single section.
pub type SectionNotes = BTreeMap<String, NoteScalar>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationNotes(BTreeMap<String, NoteValue>);

impl AnnotationNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret the stored column value.
    ///
    /// Absent, null, a JSON string or an object are all accepted. Anything
    /// that fails to parse resets to an empty map.
    pub fn parse_lenient(stored: Option<&Value>) -> Self {
        let parsed = match stored {
            None | Some(Value::Null) => return Self::default(),
            Some(Value::String(s)) if s.trim().is_empty() => return Self::default(),
            Some(Value::String(s)) => Self::parse_str(s),
            Some(value @ Value::Object(_)) => {
                serde_json::from_value(value.clone()).map_err(StepnoteError::from)
            }
            Some(other) => Err(StepnoteError::InvalidRecord(format!(
                "annotation notes must be a string or object, got {other}"
            ))),
        };
        parsed.unwrap_or_else(|e| {
            tracing::warn!("discarding unreadable annotation notes: {e}");
            Self::default()
        })
    }

    pub fn parse_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn get(&self, key: &str) -> Option<&NoteValue> {
        self.0.get(key)
    }

    /// Overwrite `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: NoteValue) -> Option<NoteValue> {
        self.0.insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NoteValue)> {
        self.0.iter()
    }

    /// Every readable field stored for (`task_number`, `section`).
    pub fn section_values(&self, task_number: &str, section: usize) -> SectionNotes {
        let prefix = AnnotationKey::section_prefix(task_number, section);
        self.0
            .iter()
            .filter_map(|(key, value)| {
                let field = key.strip_prefix(&prefix)?;
                // `4_1_` must not pick up `4_12_...` or `4_1_x_y`.
                if field.is_empty() || field.contains('_') {
                    return None;
                }
                Some((field.to_string(), value.scalar()?.clone()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
