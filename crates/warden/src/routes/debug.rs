//! Debug endpoints, enabled by `show_debug_info`.

use axum::{Json, extract::State, http::StatusCode};

use aegis_common::EventRecord;

use crate::state::AppState;

/// Recent lifecycle events, oldest first.
///
/// Hidden (404) unless `show_debug_info` is enabled; useful during
/// development, should stay off in production.
pub async fn events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventRecord>>, StatusCode> {
    if !state.config.recaptcha.show_debug_info {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(state.events.snapshot()))
}
