//! Health check endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    instance_id: String,
}

/// Basic health check (is the server running?)
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        instance_id: state.config.instance_id.clone(),
    })
}

#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    provider_endpoint: String,
    uptime_secs: i64,
}

/// Readiness check (is the provider configured?)
pub async fn ready_check(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, StatusCode> {
    if state.config.provider.endpoint.trim().is_empty() {
        // Return 503 if not ready
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(ReadyResponse {
        status: "ready",
        provider_endpoint: state.config.provider.endpoint.clone(),
        uptime_secs: state.uptime_secs(),
    }))
}
