//! HTTP route handlers for Warden.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use aegis_common::AegisError;

use crate::state::AppState;

mod debug;
mod health;
mod token;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))

        // Token lifecycle
        .route("/token/execute", post(token::execute))
        .route("/token/reset", post(token::reset))
        .route("/token/state", get(token::token_state))

        // Debug (gated by show_debug_info)
        .route("/debug/events", get(debug::events))

        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(15)))

        // Add shared state
        .with_state(state)
}

/// JSON error response derived from an [`AegisError`]
pub struct ApiError(pub AegisError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    retryable: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.0.to_string(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AegisError> for ApiError {
    fn from(err: AegisError) -> Self {
        Self(err)
    }
}
