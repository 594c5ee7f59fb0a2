use crate::backup;
use crate::ipc::error::{err, fail, ok, ErrorCode};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => {
            tracing::info!(out = %out_path.display(), "workspace bundle exported");
            ok(
                &req.id,
                json!({
                    "ok": true,
                    "path": out_path.to_string_lossy(),
                    "bundleFormat": summary.bundle_format,
                    "entryCount": summary.entry_count,
                    "dbSha256": summary.db_sha256,
                }),
            )
        }
        Err(e) => err(&req.id, "backup_failed", format!("{e:#}"), None),
    }
}

fn handle_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let workspace = match required_str(req, "workspacePath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    // Release the file before it is replaced if it is the open workspace.
    let was_open = state.workspace.as_deref() == Some(workspace.as_path());
    if was_open {
        state.close_workspace();
    }

    let summary = match backup::import_workspace_bundle(&in_path, &workspace) {
        Ok(v) => v,
        Err(e) => {
            let mut details = None;
            if was_open {
                if let Err(reopen) = state.open_workspace(&workspace) {
                    tracing::warn!(
                        workspace = %workspace.display(),
                        error = %reopen,
                        "workspace left closed after failed import"
                    );
                    details = Some(json!({
                        "reopenError": { "code": reopen.code(), "message": reopen.to_string() },
                    }));
                }
            }
            return err(&req.id, "backup_failed", format!("{e:#}"), details);
        }
    };
    if let Err(e) = state.open_workspace(&workspace) {
        return fail(&req.id, &e);
    }

    tracing::info!(workspace = %workspace.display(), "workspace bundle imported");
    ok(
        &req.id,
        json!({
            "ok": true,
            "workspacePath": workspace.to_string_lossy(),
            "bundleFormatDetected": summary.bundle_format_detected,
            "dbSha256": summary.db_sha256,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_workspace_bundle(state, req)),
        _ => None,
    }
}
