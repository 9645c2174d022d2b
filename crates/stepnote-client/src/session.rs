//! One reviewer working through tasks: load a task, mount a form per
//! assistant section, persist each answer as it changes.

use stepnote_core::focus::{FocusTracker, RequestToken};
use stepnote_core::form::{FieldChange, FormSession};
use stepnote_core::markdown::SegmentedDocument;
use stepnote_core::notes::NoteValue;
use stepnote_core::record::TaskRecord;

use crate::error::{ClientError, Result};
use crate::proxy::ProxyClient;

/// Completion of one assistant section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SectionProgress {
    pub section: usize,
    pub heading: Option<String>,
    pub answered: u8,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    proxy: ProxyClient,
    focus: FocusTracker,
}

impl ReviewSession {
    pub fn new(proxy: ProxyClient) -> Self {
        ReviewSession {
            proxy,
            focus: FocusTracker::new(),
        }
    }

    pub fn proxy(&self) -> &ProxyClient {
        &self.proxy
    }

    /// Select a task and load it.
    ///
    /// `Ok(None)` means another task was selected while this one was loading
    /// and the result was dropped.
    pub async fn open_task(&self, task_number: &str) -> Result<Option<TaskRecord>> {
        let token = self.focus.focus();
        self.load_task(token, task_number).await
    }

    /// Move focus without loading anything yet.
    pub fn begin(&self) -> RequestToken {
        self.focus.focus()
    }

    /// Load a task on behalf of `token`, discarding the outcome if focus has
    /// moved on by the time it arrives.
    pub async fn load_task(
        &self,
        token: RequestToken,
        task_number: &str,
    ) -> Result<Option<TaskRecord>> {
        let result = self.proxy.get_record_by_task_number(task_number).await;
        if !self.focus.is_current(token) {
            tracing::debug!(task_number, "discarding stale task load");
            return Ok(None);
        }
        match result? {
            Some(record) => Ok(Some(record)),
            None => Err(ClientError::TaskNotFound(task_number.to_string())),
        }
    }

    /// Apply `change` locally, then persist it. The local value stays even
    /// when the write fails; the field's save state records the failure.
    pub async fn save(&self, form: &mut FormSession, change: FieldChange) -> Result<()> {
        let write = form.change(change);
        let task_number = form.task_number().to_string();
        let result = self
            .proxy
            .update_annotation_note(&task_number, &write.key, NoteValue::now(write.value))
            .await;
        match result {
            Ok(_) => {
                form.finish(write.field, Ok(()));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(key = %write.key, "save failed: {e}");
                form.finish(write.field, Err(e.to_string()));
                Err(e)
            }
        }
    }
}

/// A form for every assistant section of `doc`, prefilled from `record`.
pub fn mount_forms(record: &TaskRecord, doc: &SegmentedDocument) -> Vec<FormSession> {
    let notes = record.notes();
    let task_number = record.task_number();
    doc.form_sections()
        .map(|marker| {
            let prefill = notes.section_values(task_number, marker.section);
            FormSession::mount(task_number, marker.section, prefill)
        })
        .collect()
}

pub fn section_progress(record: &TaskRecord, doc: &SegmentedDocument) -> Vec<SectionProgress> {
    let forms = mount_forms(record, doc);
    doc.form_sections()
        .zip(forms)
        .map(|(marker, form)| SectionProgress {
            section: marker.section,
            heading: marker.heading.clone(),
            answered: form.answered(),
            complete: form.is_complete(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
