//! Discord REST implementation of the chat gateway

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::discord::{Channel, ChannelKind, ChatGateway, Embed, Member, Role};
use crate::error::{Error, Result};

const API_BASE_URL: &str = "https://discord.com/api/v10";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// Discord channel type codes
const CHANNEL_GUILD_TEXT: u8 = 0;
const CHANNEL_GUILD_ANNOUNCEMENT: u8 = 5;
const CHANNEL_ANNOUNCEMENT_THREAD: u8 = 10;
const CHANNEL_PUBLIC_THREAD: u8 = 11;
const CHANNEL_PRIVATE_THREAD: u8 = 12;

#[derive(Debug, Deserialize)]
struct UserJson {
    id: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberJson {
    user: UserJson,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RoleJson {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChannelJson {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Deserialize)]
struct MessageJson {
    id: String,
}

fn channel_kind(code: u8) -> ChannelKind {
    match code {
        CHANNEL_GUILD_TEXT | CHANNEL_GUILD_ANNOUNCEMENT => ChannelKind::Text,
        CHANNEL_ANNOUNCEMENT_THREAD | CHANNEL_PUBLIC_THREAD | CHANNEL_PRIVATE_THREAD => {
            ChannelKind::Thread
        }
        _ => ChannelKind::Other,
    }
}

/// Bot-token REST client for the Discord API
pub struct DiscordRestGateway {
    http: reqwest::Client,
    bot_token: String,
}

impl DiscordRestGateway {
    /// Build the gateway and verify the token against the API. The
    /// reconciliation loop must not start before this has succeeded.
    pub async fn connect(bot_token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Send(e.to_string()))?;

        let gateway = Self { http, bot_token };

        let me: UserJson = gateway.get("users/@me").await?.ok_or_else(|| {
            Error::Config("Discord rejected the bot token at startup".to_string())
        })?;

        tracing::info!(
            "Connected to Discord as {} ({})",
            me.username.as_deref().unwrap_or("unknown"),
            me.id
        );

        Ok(gateway)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// GET returning `Ok(None)` on 404 and `Send` on any other failure
    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self
            .http
            .get(format!("{}/{}", API_BASE_URL, path))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| Error::Send(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Send(format!("{} on {}: {}", status, path, body)));
        }

        let payload = response
            .json()
            .await
            .map_err(|e| Error::Send(format!("malformed {} response: {}", path, e)))?;
        Ok(Some(payload))
    }

    /// Role mutation endpoints share one shape (PUT to add, DELETE to remove)
    async fn modify_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        add: bool,
        reason: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/guilds/{}/members/{}/roles/{}",
            API_BASE_URL, guild_id, user_id, role_id
        );

        let request = if add {
            self.http.put(url)
        } else {
            self.http.delete(url)
        };

        let response = request
            .header("Authorization", self.auth_header())
            .header("X-Audit-Log-Reason", reason)
            .send()
            .await
            .map_err(|e| Error::Send(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Send(format!("{} modifying role: {}", status, body)));
        }

        Ok(())
    }
}

#[async_trait]
impl ChatGateway for DiscordRestGateway {
    async fn send_message(
        &self,
        channel_id: &str,
        content: Option<&str>,
        embed: Option<&Embed>,
    ) -> Result<String> {
        let mut body = serde_json::Map::new();
        if let Some(content) = content {
            body.insert("content".to_string(), json!(content));
        }
        if let Some(embed) = embed {
            body.insert("embeds".to_string(), json!([embed]));
        }

        let response = self
            .http
            .post(format!("{}/channels/{}/messages", API_BASE_URL, channel_id))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Send(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Send(format!("{} sending message: {}", status, body)));
        }

        let message: MessageJson = response
            .json()
            .await
            .map_err(|e| Error::Send(format!("malformed message response: {}", e)))?;

        Ok(message.id)
    }

    async fn get_member(&self, guild_id: &str, user_id: &str) -> Result<Option<Member>> {
        let member: Option<MemberJson> = self
            .get(&format!("guilds/{}/members/{}", guild_id, user_id))
            .await?;

        Ok(member.map(|m| Member {
            user_id: m.user.id,
            display_name: m.nick.or(m.user.global_name).or(m.user.username),
            role_ids: m.roles,
        }))
    }

    async fn get_role(&self, guild_id: &str, role: &str) -> Result<Option<Role>> {
        let roles: Option<Vec<RoleJson>> = self.get(&format!("guilds/{}/roles", guild_id)).await?;
        let Some(roles) = roles else {
            return Ok(None);
        };

        let matched = roles
            .into_iter()
            .find(|r| r.id == role || r.name.eq_ignore_ascii_case(role));

        Ok(matched.map(|r| Role {
            id: r.id,
            name: r.name,
        }))
    }

    async fn add_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.modify_role(guild_id, user_id, role_id, true, "Now live")
            .await
    }

    async fn remove_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.modify_role(guild_id, user_id, role_id, false, "Stream ended")
            .await
    }

    async fn resolve_channel(&self, channel_id: &str) -> Result<Option<Channel>> {
        let channel: Option<ChannelJson> = self.get(&format!("channels/{}", channel_id)).await?;

        Ok(channel.map(|c| Channel {
            id: c.id,
            kind: channel_kind(c.kind),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_announcement_channels_accept_messages() {
        assert_eq!(channel_kind(0), ChannelKind::Text);
        assert_eq!(channel_kind(5), ChannelKind::Text);
        assert_eq!(channel_kind(11), ChannelKind::Thread);
        assert_eq!(channel_kind(2), ChannelKind::Other); // voice
        assert_eq!(channel_kind(4), ChannelKind::Other); // category

        let text = Channel {
            id: "1".to_string(),
            kind: ChannelKind::Text,
        };
        let voice = Channel {
            id: "2".to_string(),
            kind: ChannelKind::Other,
        };
        assert!(text.accepts_messages());
        assert!(!voice.accepts_messages());
    }
}
