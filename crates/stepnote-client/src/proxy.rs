//! Typed access to the stepnote proxy.
//!
//! Records are validated into [`TaskRecord`] here, once, so nothing above this
//! layer sees the untyped `fields` bag.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use stepnote_core::form::FormField;
use stepnote_core::notes::{AnnotationKey, AnnotationNotes, NoteScalar, NoteValue};
use stepnote_core::record::{RawRecord, TaskRecord, FIELD_ANNOTATION_NOTES};

use crate::error::{ClientError, Result};

pub const DEFAULT_PROXY_URL: &str = "http://localhost:3141/api";

#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    /// `base_url` is the proxy's `/api` root, e.g. `http://localhost:3141/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        ProxyClient { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Every task submitted under `unique_id`. No match is an empty list.
    pub async fn get_records_by_unique_id(&self, unique_id: &str) -> Result<Vec<TaskRecord>> {
        let resp = self
            .http
            .get(self.endpoint("records-by-unique-id"))
            .query(&[("uniqueId", unique_id)])
            .send()
            .await?;
        let raw: Vec<RawRecord> = decode(resp).await?;
        tracing::debug!(unique_id, count = raw.len(), "loaded task list");
        let records = raw
            .into_iter()
            .filter_map(|r| {
                TaskRecord::try_from(r)
                    .inspect_err(|e| tracing::warn!("skipping record: {e}"))
                    .ok()
            })
            .collect();
        Ok(records)
    }

    pub async fn get_record_by_task_number(&self, task_number: &str) -> Result<Option<TaskRecord>> {
        let resp = self
            .http
            .get(self.endpoint("record-by-task-number"))
            .query(&[("taskNumber", task_number)])
            .send()
            .await?;
        let raw: Option<RawRecord> = decode(resp).await?;
        Ok(raw.map(TaskRecord::try_from).transpose()?)
    }

    /// Partial update of `fields` on `record_id`; returns the updated record.
    pub async fn update_record(
        &self,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Value> {
        let resp = self
            .http
            .patch(self.endpoint("record"))
            .json(&serde_json::json!({ "recordId": record_id, "fields": fields }))
            .send()
            .await?;
        decode(resp).await
    }

    /// Read the task's notes, overwrite `key` with `value`, write the whole
    /// map back. Other keys are preserved.
    ///
    /// There is no locking: two writers racing on the same task can lose one
    /// update (last PATCH wins).
    pub async fn update_annotation_note(
        &self,
        task_number: &str,
        key: &AnnotationKey,
        value: NoteValue,
    ) -> Result<AnnotationNotes> {
        let record = self
            .get_record_by_task_number(task_number)
            .await?
            .ok_or_else(|| ClientError::TaskNotFound(task_number.to_string()))?;

        let mut notes = record.notes();
        notes.set(key.to_string(), value);

        let mut fields = Map::new();
        fields.insert(
            FIELD_ANNOTATION_NOTES.to_string(),
            Value::String(notes.to_json_string()?),
        );
        self.update_record(&record.id, fields).await?;
        tracing::info!(task_number, %key, total = notes.len(), "annotation saved");
        Ok(notes)
    }

    /// Persist one form answer as a timestamped note.
    pub async fn save_field(
        &self,
        task_number: &str,
        section: usize,
        field: FormField,
        value: NoteScalar,
    ) -> Result<AnnotationNotes> {
        let key = AnnotationKey::new(task_number, section, field.key());
        self.update_annotation_note(task_number, &key, NoteValue::now(value))
            .await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        return Err(api_error(status, &bytes));
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Prefer the proxy's `error` field; fall back to a generic message.
fn api_error(status: StatusCode, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
