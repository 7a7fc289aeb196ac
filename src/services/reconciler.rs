//! Live status reconciliation
//!
//! The recurring control loop: for every community with a configured
//! destination, batch-fetch live status for all registered subjects, diff
//! against the persisted session markers, announce new sessions at most
//! once, and converge the live role onto observed truth.
//!
//! Failure isolation invariants:
//! - one subject's failure never blocks the others,
//! - a failed batch fetch skips the whole tick with state untouched
//!   (retried automatically on the next tick),
//! - the marker is written only after a successful announcement,
//! - the marker is deleted when the subject is observed offline.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::db::settings::Destination;
use crate::db::subjects::SubjectRegistration;
use crate::db::{markers, settings, subjects};
use crate::discord::{ChatGateway, Role};
use crate::services::Notifier;
use crate::twitch::{LiveSource, StreamSnapshot};
use crate::Result;

/// The reconciliation engine. Constructed once at startup from the shared
/// context; holds no per-tick state.
pub struct Reconciler {
    db: SqlitePool,
    source: Arc<dyn LiveSource>,
    chat: Arc<dyn ChatGateway>,
    notifier: Notifier,
    /// Live role id or name from configuration; resolved per community
    live_role: Option<String>,
    last_tick: Arc<RwLock<Option<DateTime<Utc>>>>,
    last_error: Arc<RwLock<Option<String>>>,
}

impl Reconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: SqlitePool,
        source: Arc<dyn LiveSource>,
        chat: Arc<dyn ChatGateway>,
        notifier: Notifier,
        live_role: Option<String>,
        last_tick: Arc<RwLock<Option<DateTime<Utc>>>>,
        last_error: Arc<RwLock<Option<String>>>,
    ) -> Self {
        Self {
            db,
            source,
            chat,
            notifier,
            live_role,
            last_tick,
            last_error,
        }
    }

    /// Spawn the recurring reconciliation task. One serialized timer: a tick
    /// runs to completion before the next is considered, so overlapping
    /// ticks are impossible by construction.
    pub fn spawn(self: Arc<Self>, interval_secs: u64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("Reconciliation loop started ({}s interval)", interval_secs);

            loop {
                interval.tick().await;
                self.run_tick().await;
                *self.last_tick.write().await = Some(Utc::now());
            }
        })
    }

    /// One reconciliation pass over all communities. Never fails: every
    /// error is handled at the per-community or per-subject boundary.
    pub async fn run_tick(&self) {
        let destinations = match settings::list_destinations(&self.db).await {
            Ok(destinations) => destinations,
            Err(e) => {
                warn!("Skipping tick, cannot list destinations: {}", e);
                self.record_error(&e.to_string()).await;
                return;
            }
        };

        if destinations.is_empty() {
            debug!("No communities configured, nothing to reconcile");
            return;
        }

        let all_subjects = match subjects::list_subjects(&self.db).await {
            Ok(subjects) => subjects,
            Err(e) => {
                warn!("Skipping tick, cannot list subjects: {}", e);
                self.record_error(&e.to_string()).await;
                return;
            }
        };

        if all_subjects.is_empty() {
            debug!("No subjects registered, nothing to reconcile");
            return;
        }

        // One batched fetch per tick; every community reconciles against
        // the same observation. "Unknown" (a failed fetch) must not be
        // conflated with "offline": the error skips the whole tick and
        // state stays untouched until the next one.
        let user_ids: Vec<String> = all_subjects
            .iter()
            .map(|s| s.twitch_id.clone())
            .collect();

        let streams = match self.source.fetch_live_broadcasts(&user_ids).await {
            Ok(streams) => streams,
            Err(e) => {
                warn!("Skipping tick, live status fetch failed: {}", e);
                self.record_error(&e.to_string()).await;
                return;
            }
        };

        for destination in destinations {
            self.reconcile_community(&destination, &all_subjects, &streams)
                .await;
        }
    }

    /// Reconcile one community against this tick's observation. Per-subject
    /// failures are caught here and never block the remaining subjects.
    async fn reconcile_community(
        &self,
        destination: &Destination,
        all_subjects: &[SubjectRegistration],
        streams: &HashMap<String, StreamSnapshot>,
    ) {
        let live_role = self.resolve_live_role(&destination.guild_id).await;

        debug!(
            guild = %destination.guild_id,
            live = streams.len(),
            total = all_subjects.len(),
            "Reconciling community"
        );

        for subject in all_subjects {
            let snapshot = streams.get(subject.twitch_id.as_str());
            if let Err(e) = self
                .reconcile_subject(destination, subject, snapshot, live_role.as_ref())
                .await
            {
                warn!(
                    subject = %subject.login,
                    "Subject reconciliation failed, continuing with others: {}",
                    e
                );
                self.record_error(&e.to_string()).await;
            }
        }
    }

    /// The per-subject state machine.
    ///
    /// | observed | marker            | action                                      |
    /// |----------|-------------------|---------------------------------------------|
    /// | live     | absent or stale   | announce, write marker, ensure role present |
    /// | live     | == session id     | ensure role present                         |
    /// | offline  | present           | delete marker, ensure role absent           |
    /// | offline  | absent            | ensure role absent                          |
    async fn reconcile_subject(
        &self,
        destination: &Destination,
        subject: &SubjectRegistration,
        snapshot: Option<&StreamSnapshot>,
        live_role: Option<&Role>,
    ) -> Result<()> {
        match snapshot {
            Some(stream) => {
                let marker = markers::get_marker(&self.db, &subject.twitch_id).await?;
                let already_announced = marker.as_deref() == Some(stream.id.as_str());

                if !already_announced {
                    // Marker write happens-after a successful announcement;
                    // a send failure leaves the marker untouched so the next
                    // tick retries.
                    match self
                        .notifier
                        .announce(&destination.channel_id, stream, subject)
                        .await
                    {
                        Ok(_) => {
                            markers::set_marker(&self.db, &subject.twitch_id, &stream.id).await?;
                        }
                        Err(e) => {
                            warn!(
                                subject = %subject.login,
                                session = %stream.id,
                                "Announcement failed, will retry next tick: {}",
                                e
                            );
                            self.record_error(&e.to_string()).await;
                        }
                    }
                }

                // Role convergence is independent of announcement dedup and
                // retried every tick.
                self.converge_role(destination, subject, live_role, true)
                    .await;
            }
            None => {
                if markers::get_marker(&self.db, &subject.twitch_id)
                    .await?
                    .is_some()
                {
                    markers::delete_marker(&self.db, &subject.twitch_id).await?;
                    debug!(subject = %subject.login, "Subject went offline, marker cleared");
                }

                // Role removal is unconditional on the offline arm: a
                // removal that failed on the tick that cleared the marker
                // still converges here on every later tick.
                self.converge_role(destination, subject, live_role, false)
                    .await;
            }
        }

        Ok(())
    }

    /// Best-effort role correction; failures are logged and never affect
    /// marker state.
    async fn converge_role(
        &self,
        destination: &Destination,
        subject: &SubjectRegistration,
        live_role: Option<&Role>,
        should_be_present: bool,
    ) {
        let Some(role) = live_role else {
            return;
        };

        let member = match self
            .chat
            .get_member(&destination.guild_id, &subject.owner_id)
            .await
        {
            Ok(Some(member)) => member,
            Ok(None) => {
                debug!(
                    subject = %subject.login,
                    "Owner is not a member of guild {}, skipping role sync",
                    destination.guild_id
                );
                return;
            }
            Err(e) => {
                warn!(subject = %subject.login, "Member lookup failed: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .notifier
            .set_role_presence(&destination.guild_id, &member, role, should_be_present)
            .await
        {
            warn!(subject = %subject.login, "Role sync failed: {}", e);
            self.record_error(&e.to_string()).await;
        }
    }

    /// Resolve the configured live role (id or name) for one community.
    /// Missing or unresolvable roles disable role sync for the tick.
    async fn resolve_live_role(&self, guild_id: &str) -> Option<Role> {
        let configured = self.live_role.as_deref()?;

        match self.chat.get_role(guild_id, configured).await {
            Ok(Some(role)) => Some(role),
            Ok(None) => {
                warn!(
                    guild = %guild_id,
                    "Configured live role '{}' not found, skipping role sync",
                    configured
                );
                None
            }
            Err(e) => {
                warn!(guild = %guild_id, "Role resolution failed: {}", e);
                None
            }
        }
    }

    async fn record_error(&self, message: &str) {
        *self.last_error.write().await = Some(message.to_string());
    }
}
