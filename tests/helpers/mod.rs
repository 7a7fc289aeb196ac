//! Shared test fixtures: in-memory database plus hand-rolled fakes for the
//! chat gateway and the upstream live source.

// Not every test crate uses every fixture.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use golive::db::subjects::SubjectRegistration;
use golive::discord::{Channel, ChannelKind, ChatGateway, Embed, Member, Role};
use golive::error::{Error, Result};
use golive::services::{Notifier, Reconciler};
use golive::twitch::client::normalize_login;
use golive::twitch::{LiveSource, StreamSnapshot, SubjectResolver, TwitchUser};

pub const GUILD: &str = "guild-1";
pub const CHANNEL: &str = "chan-1";
pub const LIVE_ROLE_ID: &str = "role-live";

/// Create in-memory test database with schema
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    golive::db::init_tables(&pool).await.unwrap();
    pool
}

pub fn subject(owner_id: &str, twitch_id: &str, login: &str) -> SubjectRegistration {
    SubjectRegistration {
        owner_id: owner_id.to_string(),
        twitch_id: twitch_id.to_string(),
        login: login.to_string(),
        display_name: Some(login.to_uppercase()),
    }
}

pub fn snapshot(user_id: &str, session_id: &str) -> StreamSnapshot {
    snapshot_at(user_id, session_id, Utc::now())
}

pub fn snapshot_at(user_id: &str, session_id: &str, started_at: DateTime<Utc>) -> StreamSnapshot {
    StreamSnapshot {
        id: session_id.to_string(),
        user_id: user_id.to_string(),
        title: "Test broadcast".to_string(),
        game_name: "Test category".to_string(),
        viewer_count: Some(7),
        started_at,
    }
}

/// One recorded outbound message
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel_id: String,
    pub content: Option<String>,
    pub embed_url: Option<String>,
}

/// Recording fake for the chat platform. Role mutations update the member
/// map, so membership observed on the next call reflects prior mutations.
#[derive(Default)]
pub struct FakeChat {
    pub sent: Mutex<Vec<SentMessage>>,
    pub members: Mutex<HashMap<String, Member>>,
    pub roles: Mutex<Vec<Role>>,
    pub channels: Mutex<HashMap<String, Channel>>,
    pub role_adds: Mutex<Vec<(String, String)>>,
    pub role_removes: Mutex<Vec<(String, String)>>,
    /// Sends whose embed URL contains any of these fragments fail
    pub fail_sends_matching: Mutex<HashSet<String>>,
    /// The next role removal fails (one-shot)
    pub fail_next_role_remove: Mutex<bool>,
}

impl FakeChat {
    pub fn with_live_role() -> Self {
        let chat = Self::default();
        chat.roles.lock().unwrap().push(Role {
            id: LIVE_ROLE_ID.to_string(),
            name: "Live".to_string(),
        });
        chat
    }

    pub fn add_member(&self, user_id: &str, role_ids: &[&str]) {
        self.members.lock().unwrap().insert(
            user_id.to_string(),
            Member {
                user_id: user_id.to_string(),
                display_name: None,
                role_ids: role_ids.iter().map(|r| r.to_string()).collect(),
            },
        );
    }

    pub fn add_text_channel(&self, channel_id: &str) {
        self.channels.lock().unwrap().insert(
            channel_id.to_string(),
            Channel {
                id: channel_id.to_string(),
                kind: ChannelKind::Text,
            },
        );
    }

    pub fn add_other_channel(&self, channel_id: &str) {
        self.channels.lock().unwrap().insert(
            channel_id.to_string(),
            Channel {
                id: channel_id.to_string(),
                kind: ChannelKind::Other,
            },
        );
    }

    pub fn fail_sends_for(&self, fragment: &str) {
        self.fail_sends_matching
            .lock()
            .unwrap()
            .insert(fragment.to_string());
    }

    pub fn clear_send_failures(&self) {
        self.fail_sends_matching.lock().unwrap().clear();
    }

    pub fn fail_next_role_removal(&self) {
        *self.fail_next_role_remove.lock().unwrap() = true;
    }

    pub fn member_has_role(&self, user_id: &str, role_id: &str) -> bool {
        self.members
            .lock()
            .unwrap()
            .get(user_id)
            .is_some_and(|m| m.has_role(role_id))
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatGateway for FakeChat {
    async fn send_message(
        &self,
        channel_id: &str,
        content: Option<&str>,
        embed: Option<&Embed>,
    ) -> Result<String> {
        let embed_url = embed.map(|e| e.url.clone());

        if let Some(url) = &embed_url {
            let failures = self.fail_sends_matching.lock().unwrap();
            if failures.iter().any(|fragment| url.contains(fragment)) {
                return Err(Error::Send("injected send failure".to_string()));
            }
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            channel_id: channel_id.to_string(),
            content: content.map(|c| c.to_string()),
            embed_url,
        });
        Ok(format!("msg-{}", sent.len()))
    }

    async fn get_member(&self, _guild_id: &str, user_id: &str) -> Result<Option<Member>> {
        Ok(self.members.lock().unwrap().get(user_id).cloned())
    }

    async fn get_role(&self, _guild_id: &str, role: &str) -> Result<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == role || r.name.eq_ignore_ascii_case(role))
            .cloned())
    }

    async fn add_role(&self, _guild_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.role_adds
            .lock()
            .unwrap()
            .push((user_id.to_string(), role_id.to_string()));
        if let Some(member) = self.members.lock().unwrap().get_mut(user_id) {
            if !member.has_role(role_id) {
                member.role_ids.push(role_id.to_string());
            }
        }
        Ok(())
    }

    async fn remove_role(&self, _guild_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        let mut fail = self.fail_next_role_remove.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(Error::Send("injected role removal failure".to_string()));
        }
        drop(fail);

        self.role_removes
            .lock()
            .unwrap()
            .push((user_id.to_string(), role_id.to_string()));
        if let Some(member) = self.members.lock().unwrap().get_mut(user_id) {
            member.role_ids.retain(|id| id != role_id);
        }
        Ok(())
    }

    async fn resolve_channel(&self, channel_id: &str) -> Result<Option<Channel>> {
        Ok(self.channels.lock().unwrap().get(channel_id).cloned())
    }
}

/// Scriptable fake for the upstream streams endpoint
#[derive(Default)]
pub struct FakeSource {
    pub streams: Mutex<HashMap<String, StreamSnapshot>>,
    pub fail_next: Mutex<bool>,
    pub fetch_calls: Mutex<usize>,
}

impl FakeSource {
    pub fn set_live(&self, snapshot: StreamSnapshot) {
        self.streams
            .lock()
            .unwrap()
            .insert(snapshot.user_id.clone(), snapshot);
    }

    pub fn set_offline(&self, user_id: &str) {
        self.streams.lock().unwrap().remove(user_id);
    }

    pub fn fail_next_fetch(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

#[async_trait]
impl LiveSource for FakeSource {
    async fn fetch_live_broadcasts(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, StreamSnapshot>> {
        *self.fetch_calls.lock().unwrap() += 1;

        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(Error::Upstream("injected fetch failure".to_string()));
        }
        drop(fail);

        let streams = self.streams.lock().unwrap();
        Ok(user_ids
            .iter()
            .filter_map(|id| streams.get(id).map(|s| (id.clone(), s.clone())))
            .collect())
    }
}

/// Lookup-table fake for name resolution, keyed by normalized login
#[derive(Default)]
pub struct FakeResolver {
    pub users: HashMap<String, TwitchUser>,
}

impl FakeResolver {
    pub fn with_user(id: &str, login: &str, display_name: &str) -> Self {
        let mut users = HashMap::new();
        users.insert(
            login.to_string(),
            TwitchUser {
                id: id.to_string(),
                login: login.to_string(),
                display_name: Some(display_name.to_string()),
            },
        );
        Self { users }
    }
}

#[async_trait]
impl SubjectResolver for FakeResolver {
    async fn resolve_subject(&self, input: &str) -> Result<Option<TwitchUser>> {
        Ok(self.users.get(&normalize_login(input)).cloned())
    }
}

/// Everything a reconciler test needs, wired together
pub struct TestRig {
    pub db: SqlitePool,
    pub chat: Arc<FakeChat>,
    pub source: Arc<FakeSource>,
    pub reconciler: Reconciler,
}

/// Build a reconciler over an in-memory database with one configured
/// community and the live role enabled.
pub async fn build_rig(chat: FakeChat) -> TestRig {
    let db = create_test_db().await;
    golive::db::settings::set_destination(&db, GUILD, CHANNEL)
        .await
        .unwrap();

    let chat = Arc::new(chat);
    let source = Arc::new(FakeSource::default());

    let notifier = Notifier::new(chat.clone(), None);
    let reconciler = Reconciler::new(
        db.clone(),
        source.clone(),
        chat.clone(),
        notifier,
        Some(LIVE_ROLE_ID.to_string()),
        Arc::new(RwLock::new(None)),
        Arc::new(RwLock::new(None)),
    );

    TestRig {
        db,
        chat,
        source,
        reconciler,
    }
}
