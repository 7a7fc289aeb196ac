//! Per-community settings (key-value store keyed by guild id)
//!
//! The only setting the reconciler cares about is the notification
//! destination; a community with no destination is skipped entirely.

use crate::Result;
use sqlx::SqlitePool;

/// Setting key for the announcement destination channel
pub const NOTIFY_CHANNEL_KEY: &str = "notify_channel_id";

/// A community with a configured announcement destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub guild_id: String,
    pub channel_id: String,
}

/// Get a setting value for a community
pub async fn get_setting(db: &SqlitePool, guild_id: &str, key: &str) -> Result<Option<String>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE guild_id = ? AND key = ?")
            .bind(guild_id)
            .bind(key)
            .fetch_optional(db)
            .await?;
    Ok(value)
}

/// Upsert a setting value for a community
pub async fn set_setting(db: &SqlitePool, guild_id: &str, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (guild_id, key, value) VALUES (?, ?, ?)
        ON CONFLICT(guild_id, key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(guild_id)
    .bind(key)
    .bind(value)
    .execute(db)
    .await?;
    Ok(())
}

/// Get the announcement destination for one community
pub async fn get_destination(db: &SqlitePool, guild_id: &str) -> Result<Option<String>> {
    get_setting(db, guild_id, NOTIFY_CHANNEL_KEY).await
}

/// Upsert the announcement destination for one community
pub async fn set_destination(db: &SqlitePool, guild_id: &str, channel_id: &str) -> Result<()> {
    set_setting(db, guild_id, NOTIFY_CHANNEL_KEY, channel_id).await
}

/// List every community with a configured destination, in stable order
pub async fn list_destinations(db: &SqlitePool) -> Result<Vec<Destination>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT guild_id, value FROM settings WHERE key = ? ORDER BY guild_id",
    )
    .bind(NOTIFY_CHANNEL_KEY)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(guild_id, channel_id)| Destination {
            guild_id,
            channel_id,
        })
        .collect())
}
