//! # golive
//!
//! Go-live announcement service: watches a registry of Twitch creators and
//! mirrors their live/offline state into a Discord community — one
//! announcement per broadcast session, plus a "currently live" role kept in
//! sync with observed truth.
//!
//! Structure:
//! - `twitch` — upstream client (token cache, batched status, name resolution)
//! - `db` — durable state (destinations, registrations, session markers)
//! - `discord` — capability-typed chat gateway
//! - `services` — the reconciler, notifier, and registration actions
//! - `api` — health/status endpoints

pub mod api;
pub mod config;
pub mod db;
pub mod discord;
pub mod error;
pub mod services;
pub mod twitch;

pub use error::{Error, Result};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared context constructed once at startup and passed into the
/// reconciler and the status handlers. No ambient globals.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Configured reconciliation interval, for tick-staleness detection
    pub poll_interval_secs: u64,
    /// Completion time of the most recent reconciliation tick
    pub last_tick: Arc<RwLock<Option<DateTime<Utc>>>>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, poll_interval_secs: u64) -> Self {
        Self {
            db,
            startup_time: Utc::now(),
            poll_interval_secs,
            last_tick: Arc::new(RwLock::new(None)),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build the status router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::status_routes())
        .with_state(state)
}
