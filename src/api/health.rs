//! Health check endpoint
//!
//! Reports "degraded" when the reconciliation loop has not completed a tick
//! for several intervals, which is the usual symptom of a hung upstream
//! call or credential trouble.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Ticks older than this many intervals flip the status to "degraded"
const STALE_TICK_INTERVALS: i64 = 3;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", "starting" (no tick completed yet), or "degraded"
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Seconds since the last completed reconciliation tick
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_age_seconds: Option<u64>,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = Utc::now();
    let uptime_seconds = now
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    let last_tick = *state.last_tick.read().await;
    let tick_age = last_tick.map(|t| now.signed_duration_since(t).num_seconds().max(0));

    let stale_after = state.poll_interval_secs as i64 * STALE_TICK_INTERVALS;
    let status = match tick_age {
        None => "starting",
        Some(age) if age > stale_after => "degraded",
        Some(_) => "ok",
    };

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        tick_age_seconds: tick_age.map(|age| age as u64),
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
