use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{form_fail, record_kind, required_str, saved_json};
use crate::ipc::types::{AppState, Request};
use crate::store::SqliteStore;
use serde_json::json;

fn handle_open_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match record_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let form = state.forms.get_mut(kind);
    form.open_create(&state.config);
    ok(&req.id, form.snapshot())
}

fn handle_open_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match record_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let store = SqliteStore::new(conn);
    let form = state.forms.get_mut(kind);
    match form.open_edit(&store, &id) {
        Ok(()) => ok(&req.id, form.snapshot()),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_set_field(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match record_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let field = match required_str(req, "field") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let value = req.params.get("value").cloned().unwrap_or(serde_json::Value::Null);
    let form = state.forms.get_mut(kind);
    match form.set_field(&field, value) {
        Ok(()) => ok(&req.id, form.snapshot()),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match record_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let store = SqliteStore::new(conn);
    let form = state.forms.get_mut(kind);
    match form.submit(&store, &state.config) {
        Ok(saved) => {
            let mut result = saved_json(&saved);
            result["form"] = form.snapshot();
            ok(&req.id, result)
        }
        Err(e) => {
            // The dialog stays open; hand the draft back with the error.
            let mut resp = form_fail(req, &e, form.last_notification());
            resp["error"]["details"]["form"] = form.snapshot();
            resp
        }
    }
}

fn handle_cancel(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match record_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let form = state.forms.get_mut(kind);
    form.cancel();
    ok(&req.id, form.snapshot())
}

fn handle_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match record_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "form": state.forms.get(kind).snapshot() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "forms.openCreate" => Some(handle_open_create(state, req)),
        "forms.openEdit" => Some(handle_open_edit(state, req)),
        "forms.setField" => Some(handle_set_field(state, req)),
        "forms.submit" => Some(handle_submit(state, req)),
        "forms.cancel" => Some(handle_cancel(state, req)),
        "forms.state" => Some(handle_state(state, req)),
        _ => None,
    }
}
