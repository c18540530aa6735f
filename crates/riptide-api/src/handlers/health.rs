//! `GET /health` — no authentication (§6.1, §4.7).

use axum::{extract::State, http::StatusCode, Json};
use riptide_types::HealthStatus;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let checks = state.health.check_all().await;
    let overall = state.health.overall_status().await;

    let checks_json: Value = checks
        .into_iter()
        .map(|(name, status)| (name, status_json(&status)))
        .collect::<serde_json::Map<_, _>>()
        .into();

    let status_code = match overall {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded { .. } => StatusCode::OK,
        HealthStatus::Unhealthy { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };

    let (overall_state, overall_detail) = status_parts(&overall);

    let body = json!({
        "status": overall_state,
        "detail": overall_detail,
        "checks": checks_json,
        "http_client": "ready",
    });

    (status_code, Json(body))
}

fn status_json(status: &HealthStatus) -> Value {
    let (state, detail) = status_parts(status);
    json!({ "state": state, "detail": detail })
}

fn status_parts(status: &HealthStatus) -> (&'static str, Option<&str>) {
    match status {
        HealthStatus::Healthy => ("healthy", None),
        HealthStatus::Degraded { reason } => ("degraded", Some(reason.as_str())),
        HealthStatus::Unhealthy { error } => ("unhealthy", Some(error.as_str())),
    }
}
