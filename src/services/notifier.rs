//! Announcement rendering and role convergence
//!
//! Message rendering is pure; the two side effects each issue at most one
//! gateway call. Neither retries: a lost announcement is retried by the next
//! tick's marker logic, and role state re-converges every tick.

use std::sync::Arc;

use crate::db::subjects::SubjectRegistration;
use crate::discord::{ChatGateway, Embed, EmbedField, EmbedFooter, EmbedImage, Member, Role};
use crate::twitch::StreamSnapshot;
use crate::Result;

const TWITCH_PURPLE: u32 = 0x9146FF;
const FALLBACK_TITLE: &str = "Streaming now";
const FALLBACK_CATEGORY: &str = "No category";
const VIEWER_PLACEHOLDER: &str = "—";

/// Canonical channel URL for a login
pub fn channel_url(login: &str) -> String {
    format!("https://twitch.tv/{}", login)
}

/// Twitch's server-rendered live preview image for a login
pub fn preview_image_url(login: &str) -> String {
    format!(
        "https://static-cdn.jtvnw.net/previews-ttv/live_user_{}-1280x720.jpg",
        login
    )
}

/// Render the announcement for one broadcast: optional mention content plus
/// the embed. Deterministic given the snapshot and registration.
pub fn render_announcement(
    snapshot: &StreamSnapshot,
    subject: &SubjectRegistration,
    mention_role_id: Option<&str>,
) -> (Option<String>, Embed) {
    let display = subject.render_name();
    let url = channel_url(&subject.login);

    let title = if snapshot.title.trim().is_empty() {
        FALLBACK_TITLE
    } else {
        snapshot.title.as_str()
    };
    let category = if snapshot.game_name.trim().is_empty() {
        FALLBACK_CATEGORY
    } else {
        snapshot.game_name.as_str()
    };
    let viewers = snapshot
        .viewer_count
        .map(|count| count.to_string())
        .unwrap_or_else(|| VIEWER_PLACEHOLDER.to_string());

    let embed = Embed {
        title: format!("{} is LIVE!", display),
        url: url.clone(),
        description: format!("**{}**", title),
        color: TWITCH_PURPLE,
        fields: vec![
            EmbedField {
                name: "Category".to_string(),
                value: category.to_string(),
                inline: true,
            },
            EmbedField {
                name: "Viewers".to_string(),
                value: viewers,
                inline: true,
            },
        ],
        image: Some(EmbedImage {
            url: preview_image_url(&subject.login),
        }),
        footer: Some(EmbedFooter {
            text: "Twitch go-live alert".to_string(),
        }),
    };

    let content = mention_role_id
        .map(|role_id| format!("<@&{}> {} is now live → {}", role_id, display, url));

    (content, embed)
}

/// Chat-platform side effects for the reconciler
pub struct Notifier {
    chat: Arc<dyn ChatGateway>,
    mention_role_id: Option<String>,
}

impl Notifier {
    pub fn new(chat: Arc<dyn ChatGateway>, mention_role_id: Option<String>) -> Self {
        Self {
            chat,
            mention_role_id,
        }
    }

    /// Send exactly one announcement message. No retry here: on failure the
    /// caller skips the marker write and the next tick announces again.
    pub async fn announce(
        &self,
        channel_id: &str,
        snapshot: &StreamSnapshot,
        subject: &SubjectRegistration,
    ) -> Result<String> {
        let (content, embed) =
            render_announcement(snapshot, subject, self.mention_role_id.as_deref());

        let message_id = self
            .chat
            .send_message(channel_id, content.as_deref(), Some(&embed))
            .await?;

        tracing::info!(
            subject = %subject.login,
            session = %snapshot.id,
            "Announced live broadcast"
        );

        Ok(message_id)
    }

    /// Converge a member's live-role state onto `should_be_present`.
    /// No-op when observed membership already matches.
    pub async fn set_role_presence(
        &self,
        guild_id: &str,
        member: &Member,
        role: &Role,
        should_be_present: bool,
    ) -> Result<()> {
        if member.has_role(&role.id) == should_be_present {
            return Ok(());
        }

        if should_be_present {
            self.chat
                .add_role(guild_id, &member.user_id, &role.id)
                .await?;
            tracing::info!(member = %member.user_id, role = %role.name, "Granted live role");
        } else {
            self.chat
                .remove_role(guild_id, &member.user_id, &role.id)
                .await?;
            tracing::info!(member = %member.user_id, role = %role.name, "Removed live role");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn subject() -> SubjectRegistration {
        SubjectRegistration {
            owner_id: "100".to_string(),
            twitch_id: "1".to_string(),
            login: "somestreamer".to_string(),
            display_name: Some("SomeStreamer".to_string()),
        }
    }

    fn snapshot(title: &str, game: &str, viewers: Option<u64>) -> StreamSnapshot {
        StreamSnapshot {
            id: "s1".to_string(),
            user_id: "1".to_string(),
            title: title.to_string(),
            game_name: game.to_string(),
            viewer_count: viewers,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn renders_title_category_and_viewers() {
        let (content, embed) =
            render_announcement(&snapshot("Speedrun night", "Metroid", Some(42)), &subject(), None);

        assert!(content.is_none());
        assert_eq!(embed.title, "SomeStreamer is LIVE!");
        assert_eq!(embed.url, "https://twitch.tv/somestreamer");
        assert_eq!(embed.description, "**Speedrun night**");
        assert_eq!(embed.fields[0].value, "Metroid");
        assert_eq!(embed.fields[1].value, "42");
    }

    #[test]
    fn empty_fields_fall_back() {
        let (_, embed) = render_announcement(&snapshot("", "  ", None), &subject(), None);

        assert_eq!(embed.description, format!("**{}**", FALLBACK_TITLE));
        assert_eq!(embed.fields[0].value, FALLBACK_CATEGORY);
        assert_eq!(embed.fields[1].value, VIEWER_PLACEHOLDER);
    }

    #[test]
    fn mention_role_produces_ping_content() {
        let (content, _) =
            render_announcement(&snapshot("t", "g", Some(1)), &subject(), Some("555"));

        let content = content.unwrap();
        assert!(content.starts_with("<@&555>"));
        assert!(content.contains("https://twitch.tv/somestreamer"));
    }

    #[test]
    fn preview_image_is_templated_from_login() {
        let (_, embed) = render_announcement(&snapshot("t", "g", None), &subject(), None);
        assert_eq!(
            embed.image.unwrap().url,
            "https://static-cdn.jtvnw.net/previews-ttv/live_user_somestreamer-1280x720.jpg"
        );
    }

    #[test]
    fn login_is_used_when_display_name_missing() {
        let mut subject = subject();
        subject.display_name = None;
        let (_, embed) = render_announcement(&snapshot("t", "g", None), &subject, None);
        assert_eq!(embed.title, "somestreamer is LIVE!");
    }
}
