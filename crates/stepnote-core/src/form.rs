//! The five-question annotation form attached to each assistant step.
//!
//! Every control change updates local state first and yields one write for
//! the caller to persist. A failed write is recorded in [`SaveTracker`] but
//! the local value is kept, so displayed and stored values can diverge until
//! the next successful save.

use crate::error::{Result, StepnoteError};
use crate::notes::{AnnotationKey, NoteScalar, SectionNotes};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub const QUESTION_COUNT: u8 = 5;

// ---------------------------------------------------------------------------
// Choice enums
// ---------------------------------------------------------------------------

macro_rules! choice {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = StepnoteError;

            fn from_str(s: &str) -> Result<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| StepnoteError::InvalidFieldValue {
                        field: $field.to_string(),
                        value: s.to_string(),
                    })
            }
        }
    };
}

choice!(
    /// What kind of step the agent took.
    ActionCategory, "actionCategory" {
        InformationGathering => "information-gathering",
        CodeModification => "code-modification",
        CodeExecution => "code-execution",
        Testing => "testing",
        Planning => "planning",
        Communication => "communication",
        Other => "other",
    }
);

choice!(ActionCorrectness, "actionCorrectness" {
    Correct => "correct",
    PartiallyCorrect => "partially-correct",
    Incorrect => "incorrect",
    CannotDetermine => "cannot-determine",
});

choice!(ReasoningQuality, "reasoningQuality" {
    Excellent => "excellent",
    Good => "good",
    Adequate => "adequate",
    Poor => "poor",
    NoReasoning => "no-reasoning",
});

choice!(
    /// How well the agent read the sandbox's response to its previous step.
    SandboxInterpretation, "sandboxResponseInterpretation" {
        Correct => "correct",
        PartiallyCorrect => "partially-correct",
        Incorrect => "incorrect",
        Ignored => "ignored",
        NotApplicable => "not-applicable",
    }
);

choice!(
    /// `Na` is exclusive with every other flag.
    ErrorFlag, "errorFlags" {
        Na => "na",
        Hallucination => "hallucination",
        WrongTool => "wrong-tool",
        IncorrectSyntax => "incorrect-syntax",
        LogicError => "logic-error",
        IgnoredInstructions => "ignored-instructions",
        RepeatedAction => "repeated-action",
        PrematureCompletion => "premature-completion",
        Other => "other",
    }
);

// ---------------------------------------------------------------------------
// FormField
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    ActionCategory,
    ActionCategoryOther,
    ActionCorrectness,
    ReasoningQuality,
    SandboxResponseInterpretation,
    ErrorFlags,
    ErrorFlagsOther,
}

impl FormField {
    pub const ALL: &'static [FormField] = &[
        FormField::ActionCategory,
        FormField::ActionCategoryOther,
        FormField::ActionCorrectness,
        FormField::ReasoningQuality,
        FormField::SandboxResponseInterpretation,
        FormField::ErrorFlags,
        FormField::ErrorFlagsOther,
    ];

    /// Field name used in annotation keys.
    pub fn key(&self) -> &'static str {
        match self {
            FormField::ActionCategory => "actionCategory",
            FormField::ActionCategoryOther => "actionCategoryOther",
            FormField::ActionCorrectness => "actionCorrectness",
            FormField::ReasoningQuality => "reasoningQuality",
            FormField::SandboxResponseInterpretation => "sandboxResponseInterpretation",
            FormField::ErrorFlags => "errorFlags",
            FormField::ErrorFlagsOther => "errorFlagsOther",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FormField {
    type Err = StepnoteError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.key() == s)
            .ok_or_else(|| StepnoteError::UnknownField(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// FieldChange
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    ActionCategory(ActionCategory),
    ActionCategoryOther(String),
    ActionCorrectness(ActionCorrectness),
    ReasoningQuality(ReasoningQuality),
    SandboxResponseInterpretation(SandboxInterpretation),
    /// Flip one flag, applying the `na` exclusion rule.
    ToggleErrorFlag(ErrorFlag),
    /// Replace the whole flag set.
    SetErrorFlags(BTreeSet<ErrorFlag>),
    ErrorFlagsOther(String),
}

impl FieldChange {
    /// Build a change from a field name and raw text values.
    ///
    /// `errorFlags` takes any number of values (the new set); every other
    /// field takes its values joined with spaces.
    pub fn parse(field: &str, values: &[String]) -> Result<Self> {
        let field: FormField = field.parse()?;
        let text = values.join(" ");
        let change = match field {
            FormField::ActionCategory => FieldChange::ActionCategory(text.parse()?),
            FormField::ActionCategoryOther => FieldChange::ActionCategoryOther(text),
            FormField::ActionCorrectness => FieldChange::ActionCorrectness(text.parse()?),
            FormField::ReasoningQuality => FieldChange::ReasoningQuality(text.parse()?),
            FormField::SandboxResponseInterpretation => {
                FieldChange::SandboxResponseInterpretation(text.parse()?)
            }
            FormField::ErrorFlags => {
                let flags = values
                    .iter()
                    .flat_map(|v| v.split(','))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::parse)
                    .collect::<Result<BTreeSet<ErrorFlag>>>()?;
                if flags.contains(&ErrorFlag::Na) && flags.len() > 1 {
                    return Err(StepnoteError::InvalidFieldValue {
                        field: field.key().to_string(),
                        value: text,
                    });
                }
                FieldChange::SetErrorFlags(flags)
            }
            FormField::ErrorFlagsOther => FieldChange::ErrorFlagsOther(text),
        };
        Ok(change)
    }

    pub fn field(&self) -> FormField {
        match self {
            FieldChange::ActionCategory(_) => FormField::ActionCategory,
            FieldChange::ActionCategoryOther(_) => FormField::ActionCategoryOther,
            FieldChange::ActionCorrectness(_) => FormField::ActionCorrectness,
            FieldChange::ReasoningQuality(_) => FormField::ReasoningQuality,
            FieldChange::SandboxResponseInterpretation(_) => {
                FormField::SandboxResponseInterpretation
            }
            FieldChange::ToggleErrorFlag(_) | FieldChange::SetErrorFlags(_) => {
                FormField::ErrorFlags
            }
            FieldChange::ErrorFlagsOther(_) => FormField::ErrorFlagsOther,
        }
    }
}

// ---------------------------------------------------------------------------
// AnnotationForm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnotationForm {
    pub action_category: Option<ActionCategory>,
    pub action_category_other: String,
    pub action_correctness: Option<ActionCorrectness>,
    pub reasoning_quality: Option<ReasoningQuality>,
    pub sandbox_interpretation: Option<SandboxInterpretation>,
    pub error_flags: BTreeSet<ErrorFlag>,
    pub error_flags_other: String,
}

impl AnnotationForm {
    /// Hydrate from stored values. Values that no longer parse stay unset.
    pub fn from_notes(notes: &SectionNotes) -> Self {
        let mut form = AnnotationForm::default();
        for (name, value) in notes {
            let Ok(field) = name.parse::<FormField>() else {
                continue;
            };
            let text = value.as_text().unwrap_or_default();
            match field {
                FormField::ActionCategory => form.action_category = parse_stored(field, text),
                FormField::ActionCategoryOther => form.action_category_other = text.to_string(),
                FormField::ActionCorrectness => {
                    form.action_correctness = parse_stored(field, text)
                }
                FormField::ReasoningQuality => form.reasoning_quality = parse_stored(field, text),
                FormField::SandboxResponseInterpretation => {
                    form.sandbox_interpretation = parse_stored(field, text)
                }
                FormField::ErrorFlags => {
                    form.error_flags = value
                        .as_tags()
                        .iter()
                        .filter_map(|tag| parse_stored(field, tag))
                        .collect();
                }
                FormField::ErrorFlagsOther => form.error_flags_other = text.to_string(),
            }
        }
        form
    }

    /// Apply `change` and return the field to persist with its new value.
    pub fn apply(&mut self, change: FieldChange) -> (FormField, NoteScalar) {
        let field = change.field();
        match change {
            FieldChange::ActionCategory(v) => self.action_category = Some(v),
            FieldChange::ActionCategoryOther(v) => self.action_category_other = v,
            FieldChange::ActionCorrectness(v) => self.action_correctness = Some(v),
            FieldChange::ReasoningQuality(v) => self.reasoning_quality = Some(v),
            FieldChange::SandboxResponseInterpretation(v) => self.sandbox_interpretation = Some(v),
            FieldChange::ToggleErrorFlag(flag) => self.toggle_error_flag(flag),
            FieldChange::SetErrorFlags(flags) => self.error_flags = flags,
            FieldChange::ErrorFlagsOther(v) => self.error_flags_other = v,
        }
        (field, self.value_of(field))
    }

    /// `na` clears every other flag; any other flag clears `na`.
    pub fn toggle_error_flag(&mut self, flag: ErrorFlag) {
        if self.error_flags.remove(&flag) {
            return;
        }
        if flag == ErrorFlag::Na {
            self.error_flags.clear();
        } else {
            self.error_flags.remove(&ErrorFlag::Na);
        }
        self.error_flags.insert(flag);
    }

    /// Current value of `field` in its stored shape.
    pub fn value_of(&self, field: FormField) -> NoteScalar {
        fn opt<T: fmt::Display>(v: &Option<T>) -> NoteScalar {
            NoteScalar::Text(v.as_ref().map(ToString::to_string).unwrap_or_default())
        }
        match field {
            FormField::ActionCategory => opt(&self.action_category),
            FormField::ActionCategoryOther => self.action_category_other.clone().into(),
            FormField::ActionCorrectness => opt(&self.action_correctness),
            FormField::ReasoningQuality => opt(&self.reasoning_quality),
            FormField::SandboxResponseInterpretation => opt(&self.sandbox_interpretation),
            FormField::ErrorFlags => NoteScalar::List(
                self.error_flags
                    .iter()
                    .map(|f| f.as_str().to_string())
                    .collect(),
            ),
            FormField::ErrorFlagsOther => self.error_flags_other.clone().into(),
        }
    }

    /// How many of the five questions are fully answered.
    pub fn answered(&self) -> u8 {
        let category = match self.action_category {
            Some(ActionCategory::Other) => !self.action_category_other.trim().is_empty(),
            Some(_) => true,
            None => false,
        };
        let flags = !self.error_flags.is_empty()
            && (!self.error_flags.contains(&ErrorFlag::Other)
                || !self.error_flags_other.trim().is_empty());
        [
            category,
            self.action_correctness.is_some(),
            self.reasoning_quality.is_some(),
            self.sandbox_interpretation.is_some(),
            flags,
        ]
        .iter()
        .filter(|answered| **answered)
        .count() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.answered() == QUESTION_COUNT
    }
}

fn parse_stored<T: FromStr>(field: FormField, text: &str) -> Option<T> {
    if text.is_empty() {
        return None;
    }
    match text.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring stored value {text:?} for {field}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// SaveTracker
// ---------------------------------------------------------------------------

/// Per-field persistence state: `Unset → Pending → Saved | Error`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveState {
    #[default]
    Unset,
    Pending,
    Saved,
    Error(String),
}

#[derive(Debug, Clone, Default)]
pub struct SaveTracker(BTreeMap<FormField, SaveState>);

impl SaveTracker {
    pub fn state(&self, field: FormField) -> &SaveState {
        static UNSET: SaveState = SaveState::Unset;
        self.0.get(&field).unwrap_or(&UNSET)
    }

    pub fn begin(&mut self, field: FormField) {
        self.0.insert(field, SaveState::Pending);
    }

    pub fn finish(&mut self, field: FormField, outcome: std::result::Result<(), String>) {
        let state = match outcome {
            Ok(()) => SaveState::Saved,
            Err(msg) => SaveState::Error(msg),
        };
        self.0.insert(field, state);
    }

    pub fn any_pending(&self) -> bool {
        self.0.values().any(|s| *s == SaveState::Pending)
    }

    pub fn errors(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().filter_map(|(field, state)| match state {
            SaveState::Error(msg) => Some((*field, msg.as_str())),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// FormSession
// ---------------------------------------------------------------------------

/// A write produced by a control change, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub field: FormField,
    pub key: AnnotationKey,
    pub value: NoteScalar,
}

/// A mounted form for one (task, section).
#[derive(Debug, Clone)]
pub struct FormSession {
    task_number: String,
    section: usize,
    prefill: SectionNotes,
    pub form: AnnotationForm,
    pub saves: SaveTracker,
}

impl FormSession {
    pub fn mount(task_number: impl Into<String>, section: usize, prefill: SectionNotes) -> Self {
        let form = AnnotationForm::from_notes(&prefill);
        FormSession {
            task_number: task_number.into(),
            section,
            prefill,
            form,
            saves: SaveTracker::default(),
        }
    }

    pub fn task_number(&self) -> &str {
        &self.task_number
    }

    pub fn section(&self) -> usize {
        self.section
    }

    /// Re-hydrate only if the task, section or prefill data changed.
    /// Returns whether the form was reset.
    pub fn sync(&mut self, task_number: &str, section: usize, prefill: &SectionNotes) -> bool {
        if self.task_number == task_number && self.section == section && &self.prefill == prefill {
            return false;
        }
        *self = FormSession::mount(task_number, section, prefill.clone());
        true
    }

    /// Apply a change locally and mark its field pending.
    pub fn change(&mut self, change: FieldChange) -> PendingWrite {
        let (field, value) = self.form.apply(change);
        self.saves.begin(field);
        PendingWrite {
            field,
            key: AnnotationKey::new(self.task_number.clone(), self.section, field.key()),
            value,
        }
    }

    /// Record how a write went. The local value is never rolled back.
    pub fn finish(&mut self, field: FormField, outcome: std::result::Result<(), String>) {
        self.saves.finish(field, outcome);
    }

    pub fn answered(&self) -> u8 {
        self.form.answered()
    }

    pub fn is_complete(&self) -> bool {
        self.form.is_complete()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
