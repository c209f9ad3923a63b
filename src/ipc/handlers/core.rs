use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::GradeStore;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Opens (or creates) the workspace database and makes it the active store.
/// Returns the names of the lookup indexes in place.
pub fn select_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<Vec<String>> {
    let conn = db::open_db(path)?;
    let indexes = db::ensure_indexes(&conn);
    tracing::info!(workspace = %path.to_string_lossy(), "workspace opened");
    state.workspace = Some(path.to_path_buf());
    state.db = Some(conn);
    Ok(indexes)
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grade_count = state.db.as_ref().and_then(|conn| {
        match GradeStore::new(conn).count_all() {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(error = %e, "grade count failed, reporting null");
                None
            }
        }
    });
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "gradeCount": grade_count,
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

    match select_workspace(state, &path) {
        Ok(indexes) => ok(
            &req.id,
            json!({ "workspacePath": path.to_string_lossy(), "indexes": indexes }),
        ),
        Err(e) => {
            tracing::error!(error = ?e, "workspace open failed");
            err(&req.id, "db_open_failed", format!("{e:#}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
