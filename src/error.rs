//! Error types for golive
//!
//! One enum covers the whole service. The reconciliation loop catches
//! everything at the per-subject or per-community boundary; nothing here is
//! allowed to take the process down.

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Service error taxonomy
#[derive(Error, Debug)]
pub enum Error {
    /// Twitch credential-grant exchange failed or returned no token.
    /// Fatal for the current tick only; the token cache stays empty and the
    /// next tick retries the exchange.
    #[error("Twitch auth error: {0}")]
    Auth(String),

    /// Transport failure or non-2xx on a Twitch data call. The caller must
    /// treat this as "unknown, change nothing", not as "offline".
    #[error("Twitch API error: {0}")]
    Upstream(String),

    /// Discord message or role call failed. Isolated to one subject; on the
    /// announce path the marker write is skipped so the next tick retries.
    #[error("Discord send error: {0}")]
    Send(String),

    /// Name resolution found nothing. Surfaced to the caller as a normal
    /// outcome, not logged as a system fault.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
