use crate::config::ConfigError;
use crate::forms::FormError;
use crate::ipc::types::WorkspaceError;
use crate::model::ValidationError;
use crate::query::QueryError;
use crate::references::ReferenceError;
use crate::store::StoreError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Maps a domain error onto a stable IPC error code.
pub trait ErrorCode: std::fmt::Display {
    fn code(&self) -> &'static str;

    fn details(&self) -> Option<serde_json::Value> {
        None
    }
}

pub fn fail<E: ErrorCode>(id: &str, e: &E) -> serde_json::Value {
    tracing::warn!(id, code = e.code(), error = %e, "request failed");
    err(id, e.code(), e.to_string(), e.details())
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidCollection(_) | StoreError::InvalidId(_) => "bad_params",
            StoreError::Corrupt { .. } | StoreError::Query(_) | StoreError::Json(_) => {
                "db_query_failed"
            }
            StoreError::Write(_) => "db_write_failed",
            StoreError::Delete(_) => "db_delete_failed",
        }
    }
}

impl ErrorCode for QueryError {
    fn code(&self) -> &'static str {
        "bad_params"
    }
}

impl ErrorCode for ValidationError {
    fn code(&self) -> &'static str {
        "validation_failed"
    }

    fn details(&self) -> Option<serde_json::Value> {
        Some(json!({ "fields": self.0 }))
    }
}

impl ErrorCode for ReferenceError {
    fn code(&self) -> &'static str {
        match self {
            ReferenceError::Dangling(_) => "dangling_reference",
            ReferenceError::Store(e) => e.code(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ReferenceError::Dangling(course) => Some(json!({ "course": course })),
            ReferenceError::Store(_) => None,
        }
    }
}

impl ErrorCode for FormError {
    fn code(&self) -> &'static str {
        match self {
            FormError::Closed(_) => "form_closed",
            FormError::NotFound { .. } => "not_found",
            FormError::Validation(e) => e.code(),
            FormError::Reference(e) => e.code(),
            FormError::Store(e) => e.code(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            FormError::Validation(e) => e.details(),
            FormError::Reference(e) => e.details(),
            _ => None,
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        "config_invalid"
    }
}

impl ErrorCode for WorkspaceError {
    fn code(&self) -> &'static str {
        match self {
            WorkspaceError::Config(e) => e.code(),
            WorkspaceError::Db(_) => "db_open_failed",
        }
    }
}
