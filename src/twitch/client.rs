//! Twitch Helix client with app-token caching and batched stream lookups

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::twitch::models::{
    SearchResponse, StreamSnapshot, StreamsResponse, TokenResponse, TwitchUser, UsersResponse,
};

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A cached token is reused only while more than this margin remains before
/// expiry; otherwise a fresh exchange happens before the dependent call.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Fallback token lifetime when the exchange omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// What the registry needs from the streaming platform: turn human-entered
/// text into a canonical profile. `Ok(None)` is the normal "no such user"
/// outcome, never an error.
#[async_trait]
pub trait SubjectResolver: Send + Sync {
    async fn resolve_subject(&self, input: &str) -> Result<Option<TwitchUser>>;
}

/// What the reconciler needs from the streaming platform
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Fetch current broadcasts for a batch of subject ids. Subjects absent
    /// from the result are authoritatively offline. An empty input returns
    /// an empty map without touching the network.
    async fn fetch_live_broadcasts(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, StreamSnapshot>>;
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Helix API client
pub struct TwitchClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl TwitchClient {
    pub fn new(client_id: String, client_secret: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Upstream(e.to_string()))?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            token: Mutex::new(None),
        })
    }

    /// Get a bearer token, exchanging credentials only when the cached token
    /// is missing or within the expiry margin.
    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token_still_valid(token.expires_at, Instant::now()) {
                return Ok(token.access_token.clone());
            }
        }

        tracing::debug!("Exchanging Twitch client credentials for app token");

        let response = self
            .http
            .post(TOKEN_URL)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;

        let access_token = token
            .access_token
            .ok_or_else(|| Error::Auth("token exchange returned no access_token".to_string()))?;

        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        tracing::info!("Twitch app token refreshed (lifetime {}s)", lifetime);

        Ok(access_token)
    }

    /// Authenticated GET against a Helix endpoint
    async fn helix_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.bearer_token().await?;

        let response = self
            .http
            .get(format!("{}/{}", HELIX_BASE_URL, path))
            .header("Client-ID", &self.client_id)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("{} on {}: {}", status, path, body)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("malformed {} response: {}", path, e)))
    }

    /// Look up a user by exact login. Unknown logins are `Ok(None)`.
    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<TwitchUser>> {
        let response: UsersResponse = self.helix_get("users", &[("login", login)]).await?;
        Ok(response.data.into_iter().next())
    }
}

#[async_trait]
impl SubjectResolver for TwitchClient {
    /// Resolve human-entered text (handle, @handle, profile URL, or display
    /// name) to a user: normalize, try the exact login, then fall back to a
    /// fuzzy channel search preferring an exact case-insensitive
    /// display-name match over the top result.
    async fn resolve_subject(&self, input: &str) -> Result<Option<TwitchUser>> {
        let login = normalize_login(input);
        if login.is_empty() {
            return Ok(None);
        }

        if let Some(user) = self.get_user_by_login(&login).await? {
            return Ok(Some(user));
        }

        let response: SearchResponse = self
            .helix_get("search/channels", &[("query", login.as_str())])
            .await?;

        let exact = response.data.iter().position(|c| {
            c.display_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(&login))
        });

        let chosen = match exact {
            Some(index) => response.data.into_iter().nth(index),
            None => response.data.into_iter().next(),
        };

        Ok(chosen.map(TwitchUser::from))
    }
}

#[async_trait]
impl LiveSource for TwitchClient {
    async fn fetch_live_broadcasts(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, StreamSnapshot>> {
        // A helix/streams call with no user_id filter would return the global
        // stream list; short-circuit before any network traffic.
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query: Vec<(&str, &str)> = user_ids
            .iter()
            .map(|id| ("user_id", id.as_str()))
            .collect();

        let response: StreamsResponse = self.helix_get("streams", &query).await?;

        Ok(response
            .data
            .into_iter()
            .map(|stream| (stream.user_id.clone(), stream))
            .collect())
    }
}

/// Whether a cached token is still usable at `now`
fn token_still_valid(expires_at: Instant, now: Instant) -> bool {
    expires_at > now && expires_at - now > TOKEN_EXPIRY_MARGIN
}

/// Normalize human input to a canonical login: strip a profile-URL prefix,
/// strip a leading `@`, trim, lowercase.
pub fn normalize_login(input: &str) -> String {
    let mut text = input.trim();

    for prefix in [
        "https://www.twitch.tv/",
        "https://twitch.tv/",
        "http://www.twitch.tv/",
        "http://twitch.tv/",
        "www.twitch.tv/",
        "twitch.tv/",
    ] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest;
            break;
        }
    }

    text = text.trim_end_matches('/');
    text = text.strip_prefix('@').unwrap_or(text);

    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_handle() {
        assert_eq!(normalize_login("  SomeStreamer "), "somestreamer");
    }

    #[test]
    fn normalizes_at_handle() {
        assert_eq!(normalize_login("@SomeStreamer"), "somestreamer");
    }

    #[test]
    fn normalizes_profile_url() {
        assert_eq!(
            normalize_login("https://www.twitch.tv/SomeStreamer/"),
            "somestreamer"
        );
        assert_eq!(normalize_login("twitch.tv/other_name"), "other_name");
    }

    #[test]
    fn empty_input_normalizes_to_empty() {
        assert_eq!(normalize_login("   "), "");
        assert_eq!(normalize_login("@"), "");
    }

    #[test]
    fn token_valid_outside_margin_only() {
        let now = Instant::now();
        assert!(token_still_valid(now + Duration::from_secs(120), now));
        assert!(!token_still_valid(now + Duration::from_secs(30), now));
        assert!(!token_still_valid(now, now));
    }

    #[tokio::test]
    async fn empty_batch_short_circuits_without_network() {
        // Deliberately unusable credentials: the empty-input guard must
        // return before any token exchange is attempted.
        let client = TwitchClient::new("invalid".to_string(), "invalid".to_string()).unwrap();
        let result = client.fetch_live_broadcasts(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}
