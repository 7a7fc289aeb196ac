//! Chat-platform collaborator interface
//!
//! The core only ever talks to Discord through [`ChatGateway`]: send a
//! message/embed, look up a member, resolve a role or channel, and toggle a
//! role. Everything is typed here so illegal destinations and malformed
//! payloads are rejected at this boundary.

pub mod rest;

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;

pub use rest::DiscordRestGateway;

/// What a destination channel can be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Plain text or announcement channel — valid announcement destination
    Text,
    /// Thread under a text channel
    Thread,
    /// Voice, forum, category, etc. — never a valid destination
    Other,
}

/// A resolved channel
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: String,
    pub kind: ChannelKind,
}

impl Channel {
    /// Whether announcements may be sent here
    pub fn accepts_messages(&self) -> bool {
        matches!(self.kind, ChannelKind::Text | ChannelKind::Thread)
    }
}

/// A guild member as observed on the chat platform
#[derive(Debug, Clone)]
pub struct Member {
    pub user_id: String,
    pub display_name: Option<String>,
    /// Role ids currently held; the reconciler corrects against this
    pub role_ids: Vec<String>,
}

impl Member {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.iter().any(|id| id == role_id)
    }
}

/// A resolved guild role
#[derive(Debug, Clone)]
pub struct Role {
    pub id: String,
    pub name: String,
}

/// Structured announcement message body (Discord embed shape)
#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Capability-typed collaborator interface to the chat platform.
///
/// Add/remove role are idempotent from the caller's perspective; callers
/// still check observed membership first to avoid pointless API traffic.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send a message and/or embed; returns the created message id
    async fn send_message(
        &self,
        channel_id: &str,
        content: Option<&str>,
        embed: Option<&Embed>,
    ) -> Result<String>;

    /// Look up a guild member; unknown members are `Ok(None)`
    async fn get_member(&self, guild_id: &str, user_id: &str) -> Result<Option<Member>>;

    /// Resolve a role by id or (case-insensitive) name
    async fn get_role(&self, guild_id: &str, role: &str) -> Result<Option<Role>>;

    async fn add_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<()>;

    async fn remove_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<()>;

    /// Resolve a channel id; unknown channels are `Ok(None)`
    async fn resolve_channel(&self, channel_id: &str) -> Result<Option<Channel>>;
}
