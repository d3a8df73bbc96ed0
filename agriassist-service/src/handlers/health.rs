use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Map, Value};

pub const SERVICE_NAME: &str = "AgriAssist AI";

/// Liveness. Never touches upstream services.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness: the model credential is present and the session store answers.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let provider = state.advisor.provider();
    let model = provider.health_check().map_err(|e| e.to_string());
    let sessions = state.sessions.health_check().await.map_err(|e| e.to_string());

    let status = if model.is_ok() && sessions.is_ok() {
        StatusCode::OK
    } else {
        tracing::warn!(
            model = ?model.as_ref().err(),
            sessions = ?sessions.as_ref().err(),
            "Readiness check failed"
        );
        StatusCode::SERVICE_UNAVAILABLE
    };

    let check = |result: Result<(), String>| match result {
        Ok(()) => Value::from("ok"),
        Err(e) => Value::from(e),
    };
    let mut checks = Map::new();
    checks.insert(provider.name().to_string(), check(model));
    checks.insert(state.sessions.name().to_string(), check(sessions));

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ready" } else { "not_ready" },
            "checks": checks,
        })),
    )
}
