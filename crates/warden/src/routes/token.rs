//! Token lifecycle endpoints.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use aegis_common::constants::TOKEN_TTL_SECS;
use aegis_common::{FieldValue, TokenState};

use super::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExecuteRequest {
    /// Action name override; the configured action applies when omitted
    action: Option<String>,

    /// Bound field value for the validation gate
    field_value: Option<FieldValue>,
}

#[derive(Serialize)]
pub struct ExecuteResponse {
    token: String,
    action: String,
    issued_at: Option<i64>,
}

/// Execute a token request
pub async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let action = payload
        .action
        .clone()
        .unwrap_or_else(|| state.config.recaptcha.action.clone());

    let token = state
        .controller
        .execute(payload.action, payload.field_value)
        .await?;
    let snapshot = state.controller.snapshot().await;

    Ok(Json(ExecuteResponse {
        token,
        action,
        issued_at: snapshot.issued_at,
    }))
}

#[derive(Serialize)]
pub struct ResetResponse {
    status: &'static str,
}

/// Cancel any pending renewal and return the lifecycle to idle
pub async fn reset(State(state): State<AppState>) -> Json<ResetResponse> {
    state.controller.reset().await;
    Json(ResetResponse { status: "idle" })
}

#[derive(Serialize)]
pub struct StateResponse {
    #[serde(flatten)]
    state: TokenState,

    /// Whether the held token is still inside the provider's 2 minute window
    token_live: bool,
}

/// Current token state (the host-facing bound value)
pub async fn token_state(State(state): State<AppState>) -> Json<StateResponse> {
    let snapshot = state.controller.snapshot().await;
    let token_live = snapshot.has_live_token(TOKEN_TTL_SECS);
    Json(StateResponse {
        state: snapshot,
        token_live,
    })
}
