//! Typed Helix payloads
//!
//! Required/optional fields are explicit so malformed upstream responses are
//! rejected at the boundary instead of surfacing as missing-key failures
//! deep inside the reconciler.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Client-credentials token exchange response.
/// `access_token` is optional on purpose: an error body from the id server
/// deserializes cleanly and is turned into an auth error by the client.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// A Twitch user profile (from `helix/users` or channel search)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TwitchUser {
    /// Stable subject id
    pub id: String,
    /// Canonical lowercase handle
    pub login: String,
    /// Display name (may differ from login in case or script)
    #[serde(default)]
    pub display_name: Option<String>,
}

/// One live broadcast as observed on a single tick (from `helix/streams`).
/// Ephemeral: produced fresh every reconciliation pass, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSnapshot {
    /// Upstream's stable identifier for this broadcast session — the dedup
    /// key. Preferred over `started_at`, which is not guaranteed unique or
    /// monotonic across restarts of the same broadcast.
    pub id: String,
    /// Subject id this broadcast belongs to
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub viewer_count: Option<u64>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub data: Vec<TwitchUser>,
}

#[derive(Debug, Deserialize)]
pub struct StreamsResponse {
    #[serde(default)]
    pub data: Vec<StreamSnapshot>,
}

/// One result from `helix/search/channels`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchChannel {
    pub id: String,
    pub broadcaster_login: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<SearchChannel>,
}

impl From<SearchChannel> for TwitchUser {
    fn from(channel: SearchChannel) -> Self {
        TwitchUser {
            id: channel.id,
            login: channel.broadcaster_login,
            display_name: channel.display_name,
        }
    }
}
