use crate::forms::{FormError, Notification, Saved};
use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::listing::SortDir;
use crate::model::RecordKind;
use crate::query::{self, Condition};
use crate::store::{DocumentStore, SqliteStore};
use chrono::{DateTime, Utc};

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn open_store<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<SqliteStore<'a>, serde_json::Value> {
    state
        .store()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn record_kind(req: &Request) -> Result<RecordKind, serde_json::Value> {
    let raw = required_str(req, "kind")?;
    RecordKind::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("unknown kind: {}", raw),
            Some(serde_json::json!({ "allowed": ["student", "course"] })),
        )
    })
}

pub fn conditions(req: &Request) -> Result<Vec<Condition>, serde_json::Value> {
    query::parse_conditions(req.params.get("conditions")).map_err(|e| fail(&req.id, &e))
}

/// `params.now` if given, otherwise the current instant.
pub fn now_param(req: &Request) -> Result<DateTime<Utc>, serde_json::Value> {
    match optional_str(req, "now") {
        None => Ok(Utc::now()),
        Some(raw) => crate::dates::parse_instant(raw)
            .ok_or_else(|| err(&req.id, "bad_params", format!("invalid now: {}", raw), None)),
    }
}

pub fn record_param(
    req: &Request,
    key: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Value> {
    match req.params.get(key) {
        Some(serde_json::Value::Object(m)) => Ok(m.clone()),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an object", key),
            None,
        )),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn sort_dir(req: &Request) -> Result<SortDir, serde_json::Value> {
    match optional_str(req, "sortDir") {
        None => Ok(SortDir::Asc),
        Some(raw) => SortDir::parse(raw)
            .ok_or_else(|| err(&req.id, "bad_params", format!("invalid sortDir: {}", raw), None)),
    }
}

pub fn saved_json(saved: &Saved) -> serde_json::Value {
    serde_json::json!({
        "id": saved.document.id,
        "created": saved.created,
        "document": saved.document.to_json(),
        "warnings": saved.warnings,
        "notification": saved.notification,
    })
}

/// Form errors other than validation carry a toast for the UI.
pub fn form_fail(
    req: &Request,
    e: &FormError,
    notification: Option<&Notification>,
) -> serde_json::Value {
    let mut resp = fail(&req.id, e);
    if let Some(n) = notification {
        let mut details = resp["error"]
            .get("details")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        details["notification"] = serde_json::json!(n);
        resp["error"]["details"] = details;
    }
    resp
}

/// Delete by id. A missing record is still reported as deleted.
pub fn delete_record(
    req: &Request,
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> serde_json::Value {
    match store.delete(collection, id) {
        Ok(existed) => ok(
            &req.id,
            serde_json::json!({
                "deleted": true,
                "existed": existed,
                "notification": { "level": "success", "message": "Data deleted successfully" },
            }),
        ),
        Err(e) => {
            let mut resp = fail(&req.id, &e);
            resp["error"]["details"] = serde_json::json!({
                "notification": { "level": "error", "message": "Failed to delete data" }
            });
            resp
        }
    }
}
