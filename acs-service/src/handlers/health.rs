use crate::services::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "acs-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready once the adapter registry is populated.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let vendors: Vec<String> = state
        .dispatcher
        .supported_types()
        .into_iter()
        .map(String::from)
        .collect();

    if vendors.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "vendors": vendors })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({ "status": "ready", "vendors": vendors })),
    )
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
