//! Reconciliation status endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{settings, subjects};
use crate::AppState;

/// GET /status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Registered subjects being watched
    pub subject_count: usize,
    /// Communities with a configured destination
    pub destination_count: usize,
    /// Completion time of the most recent reconciliation tick
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tick: Option<DateTime<Utc>>,
}

/// GET /status
pub async fn status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let subject_count = subjects::list_subjects(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .len();

    let destination_count = settings::list_destinations(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .len();

    let last_tick = *state.last_tick.read().await;

    Ok(Json(StatusResponse {
        subject_count,
        destination_count,
        last_tick,
    }))
}

/// Build status routes
pub fn status_routes() -> Router<AppState> {
    Router::new().route("/status", get(status))
}
