//! Create/edit dialog state for student and course records.
//!
//! `Idle -> Creating | Editing -> Idle`. A failed submit keeps the dialog
//! open with its draft; nothing is retried.

use crate::config::Config;
use crate::model::{RecordKind, ValidationError};
use crate::references::{self, ReferenceError};
use crate::store::{Document, DocumentStore, StoreError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("no {0} form is open")]
    Closed(&'static str),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient message for the UI to toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Idle,
    Creating { draft: Map<String, Value> },
    Editing { id: String, draft: Map<String, Value> },
}

#[derive(Debug)]
pub struct Saved {
    pub document: Document,
    pub created: bool,
    pub warnings: Vec<&'static str>,
    pub notification: Notification,
}

/// Validates, checks the course reference and writes one record.
///
/// `id == None` creates under a fresh UUID. An update requires the record
/// to still exist and overwrites every field.
pub fn save_record(
    store: &dyn DocumentStore,
    config: &Config,
    kind: RecordKind,
    id: Option<&str>,
    fields: &Map<String, Value>,
) -> Result<Saved, FormError> {
    let normalized = kind.normalize(fields, config)?;
    if let Some(course) = &normalized.course_ref {
        references::check_course(store, course, config.references.course_policy)?;
    }

    let collection = kind.collection();
    let (id, created) = match id {
        Some(id) => {
            if store.get(collection, id)?.is_none() {
                return Err(FormError::NotFound {
                    kind: kind.as_str(),
                    id: id.to_string(),
                });
            }
            (id.to_string(), false)
        }
        None => (Uuid::new_v4().to_string(), true),
    };

    let document = store.write(collection, &id, normalized.record)?;
    let notification = if created {
        Notification::success("Data added successfully")
    } else {
        Notification::success("Data updated successfully")
    };
    Ok(Saved {
        document,
        created,
        warnings: normalized.warnings,
        notification,
    })
}

/// Validation failures stay in the form; everything else is toasted.
pub fn failure_notification(e: &FormError, updating: bool) -> Option<Notification> {
    if matches!(e, FormError::Validation(_)) {
        return None;
    }
    let verb = if updating { "update" } else { "add" };
    Some(Notification::error(format!("Failed to {verb} data: {e}")))
}

#[derive(Debug)]
pub struct FormController {
    kind: RecordKind,
    state: FormState,
    last_notification: Option<Notification>,
}

impl FormController {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            state: FormState::Idle,
            last_notification: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, FormState::Idle)
    }

    /// Replaces whatever draft was open.
    pub fn open_create(&mut self, config: &Config) {
        self.state = FormState::Creating {
            draft: self.kind.blank_draft(config),
        };
        self.last_notification = None;
    }

    /// Loads the stored record into a draft. A missing record leaves the
    /// current state alone.
    pub fn open_edit(&mut self, store: &dyn DocumentStore, id: &str) -> Result<(), FormError> {
        let Some(doc) = store.get(self.kind.collection(), id)? else {
            return Err(FormError::NotFound {
                kind: self.kind.as_str(),
                id: id.to_string(),
            });
        };
        let mut draft = doc.data;
        for meta in ["id", "createdAt", "updatedAt"] {
            draft.remove(meta);
        }
        self.state = FormState::Editing {
            id: id.to_string(),
            draft,
        };
        self.last_notification = None;
        Ok(())
    }

    pub fn set_field(&mut self, field: &str, value: Value) -> Result<(), FormError> {
        match &mut self.state {
            FormState::Idle => Err(FormError::Closed(self.kind.as_str())),
            FormState::Creating { draft } | FormState::Editing { draft, .. } => {
                draft.insert(field.to_string(), value);
                Ok(())
            }
        }
    }

    pub fn cancel(&mut self) {
        self.state = FormState::Idle;
    }

    pub fn submit(
        &mut self,
        store: &dyn DocumentStore,
        config: &Config,
    ) -> Result<Saved, FormError> {
        let (id, draft) = match &self.state {
            FormState::Idle => {
                self.last_notification = None;
                return Err(FormError::Closed(self.kind.as_str()));
            }
            FormState::Creating { draft } => (None, draft),
            FormState::Editing { id, draft } => (Some(id.as_str()), draft),
        };

        match save_record(store, config, self.kind, id, draft) {
            Ok(saved) => {
                self.state = FormState::Idle;
                self.last_notification = Some(saved.notification.clone());
                Ok(saved)
            }
            Err(e) => {
                self.last_notification = failure_notification(&e, id.is_some());
                Err(e)
            }
        }
    }

    pub fn last_notification(&self) -> Option<&Notification> {
        self.last_notification.as_ref()
    }

    pub fn snapshot(&self) -> Value {
        let mut out = match &self.state {
            FormState::Idle => json!({ "state": "idle" }),
            FormState::Creating { draft } => json!({ "state": "creating", "draft": draft }),
            FormState::Editing { id, draft } => {
                json!({ "state": "editing", "id": id, "draft": draft })
            }
        };
        out["kind"] = json!(self.kind.as_str());
        out["open"] = json!(self.is_open());
        if let Some(n) = &self.last_notification {
            out["notification"] = json!(n);
        }
        out
    }
}

/// One controller per record kind.
#[derive(Debug)]
pub struct Forms {
    pub student: FormController,
    pub course: FormController,
}

impl Default for Forms {
    fn default() -> Self {
        Self {
            student: FormController::new(RecordKind::Student),
            course: FormController::new(RecordKind::Course),
        }
    }
}

impl Forms {
    pub fn get_mut(&mut self, kind: RecordKind) -> &mut FormController {
        match kind {
            RecordKind::Student => &mut self.student,
            RecordKind::Course => &mut self.course,
        }
    }

    pub fn get(&self, kind: RecordKind) -> &FormController {
        match kind {
            RecordKind::Student => &self.student,
            RecordKind::Course => &self.course,
        }
    }
}
