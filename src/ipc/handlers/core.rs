use crate::db;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let schema_version = state
        .db
        .as_ref()
        .and_then(|conn| db::settings_get_json(conn, "schema.version").ok().flatten());
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "schemaVersion": schema_version,
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match state.open_workspace(&path) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "configPath": state.config_path.as_ref().map(|p| p.to_string_lossy().to_string()),
            }),
        ),
        Err(e) => fail(&req.id, &e),
    }
}

fn config_result(state: &AppState) -> serde_json::Value {
    json!({
        "config": state.config,
        "configPath": state.config_path.as_ref().map(|p| p.to_string_lossy().to_string()),
    })
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, config_result(state))
}

fn handle_config_reload(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.reload_config() {
        Ok(()) => ok(&req.id, config_result(state)),
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "config.get" => Some(handle_config_get(state, req)),
        "config.reload" => Some(handle_config_reload(state, req)),
        _ => None,
    }
}
