//! `POST /api/file/check` and `POST /api/file/check/batch` — bearer-protected
//! admin endpoints that probe origin existence without going through the
//! authorization pipeline (§6.1).

use axum::{extract::State, http::Method, Json};
use riptide_streaming::ProxyRequest;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::state::AppState;

const MAX_BATCH: usize = 100;

#[derive(Debug, Deserialize)]
pub struct FileCheckRequest {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct FileCheckResult {
    pub path: String,
    pub exists: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchFileCheckRequest {
    pub paths: Vec<String>,
}

pub async fn check_file(
    State(state): State<AppState>,
    Json(body): Json<FileCheckRequest>,
) -> Json<FileCheckResult> {
    let exists = probe_exists(&state, &body.path).await;
    Json(FileCheckResult {
        path: body.path,
        exists,
    })
}

pub async fn check_files_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchFileCheckRequest>,
) -> Result<Json<Vec<FileCheckResult>>, ApiError> {
    if body.paths.len() > MAX_BATCH {
        return Err(ApiError::BadRequest {
            detail: format!("at most {MAX_BATCH} paths per batch request"),
        });
    }

    let mut results = Vec::with_capacity(body.paths.len());
    for path in body.paths {
        let exists = probe_exists(&state, &path).await;
        results.push(FileCheckResult { path, exists });
    }
    Ok(Json(results))
}

/// HEAD the origin through the same transport the public proxy route uses,
/// with a synthetic caller identity — this check never goes through the
/// authorization pipeline and never registers a tracked transfer (the
/// transport drops the body before registering on HEAD requests).
async fn probe_exists(state: &AppState, path: &str) -> bool {
    let req = ProxyRequest {
        method: &Method::HEAD,
        path,
        range_header: None,
        uid: "",
        ip: "",
        session_id: "",
    };
    match state.transport.proxy(req).await {
        Ok(response) => response.status().is_success() || response.status().as_u16() == 206,
        Err(_) => false,
    }
}
