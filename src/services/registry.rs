//! Registration actions
//!
//! The explicit actions that mutate durable state outside the reconciler:
//! link/unlink a subject, list registrations, configure a community's
//! announcement destination. Validation happens here, at action time, so
//! the reconciler never sees a bad handle or an illegal destination.

use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::db::{settings, subjects};
use crate::db::subjects::SubjectRegistration;
use crate::discord::ChatGateway;
use crate::error::{Error, Result};
use crate::twitch::SubjectResolver;

pub struct Registry {
    db: SqlitePool,
    resolver: Arc<dyn SubjectResolver>,
    chat: Arc<dyn ChatGateway>,
}

impl Registry {
    pub fn new(
        db: SqlitePool,
        resolver: Arc<dyn SubjectResolver>,
        chat: Arc<dyn ChatGateway>,
    ) -> Self {
        Self { db, resolver, chat }
    }

    /// Link an owner to a Twitch account. The handle is validated upstream
    /// before anything is persisted; a second link by the same owner
    /// replaces the first.
    pub async fn link(&self, owner_id: &str, input: &str) -> Result<SubjectRegistration> {
        let user = self
            .resolver
            .resolve_subject(input)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no Twitch user matching '{}'", input)))?;

        let registration = SubjectRegistration {
            owner_id: owner_id.to_string(),
            twitch_id: user.id,
            login: user.login,
            display_name: user.display_name,
        };

        subjects::upsert_subject(&self.db, &registration).await?;
        info!(owner = %owner_id, login = %registration.login, "Linked subject");

        Ok(registration)
    }

    /// Remove an owner's registration; returns whether one existed
    pub async fn unlink(&self, owner_id: &str) -> Result<bool> {
        let removed = subjects::delete_subject(&self.db, owner_id).await?;
        if removed {
            info!(owner = %owner_id, "Unlinked subject");
        }
        Ok(removed)
    }

    pub async fn list(&self) -> Result<Vec<SubjectRegistration>> {
        subjects::list_subjects(&self.db).await
    }

    /// Configure a community's announcement destination. The channel is
    /// resolved and capability-checked now so send-time never has to reason
    /// about illegal destinations.
    pub async fn set_destination(&self, guild_id: &str, channel_id: &str) -> Result<()> {
        let channel = self
            .chat
            .resolve_channel(channel_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no such channel: {}", channel_id)))?;

        if !channel.accepts_messages() {
            return Err(Error::Config(format!(
                "channel {} cannot receive announcements",
                channel_id
            )));
        }

        settings::set_destination(&self.db, guild_id, &channel.id).await?;
        info!(guild = %guild_id, channel = %channel.id, "Destination configured");

        Ok(())
    }
}
