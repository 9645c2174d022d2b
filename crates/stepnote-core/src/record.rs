//! Task records as stored in the tabular-data service.
//!
//! The service hands back an untyped `fields` bag. [`RawRecord`] is that wire
//! shape and is what the proxy forwards; [`TaskRecord`] is the typed view the
//! client validates into once, at the data-access boundary.

use crate::error::{Result, StepnoteError};
use crate::notes::AnnotationNotes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const FIELD_TASK_NUMBER: &str = "Task Number";
pub const FIELD_LINK_TO_TASK: &str = "Link to Task";
pub const FIELD_STATUS: &str = "Status";
pub const FIELD_UNIQUE_ID: &str = "Unique ID";
pub const FIELD_ANNOTATION_NOTES: &str = "Annotation Notes";

// ---------------------------------------------------------------------------
// RawRecord
// ---------------------------------------------------------------------------

/// A record exactly as the upstream service returns it, minus metadata the
/// proxy does not forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// TaskRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    #[serde(default)]
    pub fields: TaskFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFields {
    #[serde(
        rename = "Task Number",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_number: Option<String>,

    #[serde(
        rename = "Link to Task",
        default,
        deserialize_with = "display_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub link_to_task: Option<String>,

    #[serde(
        rename = "Status",
        default,
        deserialize_with = "display_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,

    #[serde(
        rename = "Unique ID",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub unique_id: Option<String>,

    /// Either a JSON-encoded string or, for rows edited by other tools, an
    /// object. Interpreted through [`AnnotationNotes::parse_lenient`].
    #[serde(
        rename = "Annotation Notes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub annotation_notes: Option<Value>,

    /// Every other column the table carries.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskRecord {
    /// Validate an untyped JSON record into a `TaskRecord`.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| StepnoteError::InvalidRecord(e.to_string()))
    }

    /// Task Number, falling back to the record id when the column is empty.
    pub fn task_number(&self) -> &str {
        self.fields.task_number.as_deref().unwrap_or(&self.id)
    }

    /// Parsed annotation notes. Corrupt stored data yields an empty map.
    pub fn notes(&self) -> AnnotationNotes {
        AnnotationNotes::parse_lenient(self.fields.annotation_notes.as_ref())
    }
}

impl TryFrom<RawRecord> for TaskRecord {
    type Error = StepnoteError;

    fn try_from(raw: RawRecord) -> Result<Self> {
        let fields = serde_json::from_value(Value::Object(raw.fields))
            .map_err(|e| StepnoteError::InvalidRecord(format!("{}: {e}", raw.id)))?;
        Ok(TaskRecord { id: raw.id, fields })
    }
}

/// Accept a string or a number; numbers come back from numeric columns.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Informational columns never fail a record. Lookup and multi-select
/// columns arrive as arrays and are joined; other shapes are dropped.
fn display_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Array(items)) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            Some(parts.join(", ")).filter(|joined| !joined.is_empty())
        }
        Some(other) => {
            tracing::warn!("ignoring unreadable column value {other}");
            None
        }
    };
    Ok(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
