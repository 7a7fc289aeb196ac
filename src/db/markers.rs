//! Live-session markers — the announcement dedup fence
//!
//! One row per Twitch subject id holding the last announced session id.
//! Written only by the reconciler, immediately after a successful
//! announcement, and deleted when the subject is observed offline. The
//! delete-on-offline rule is what lets a future session announce again even
//! if upstream ever reuses a session id.

use crate::Result;
use sqlx::SqlitePool;

/// Get the last announced session id for a subject
pub async fn get_marker(db: &SqlitePool, twitch_id: &str) -> Result<Option<String>> {
    let session_id: Option<String> =
        sqlx::query_scalar("SELECT session_id FROM live_markers WHERE twitch_id = ?")
            .bind(twitch_id)
            .fetch_optional(db)
            .await?;
    Ok(session_id)
}

/// Record (or overwrite) the last announced session id for a subject
pub async fn set_marker(db: &SqlitePool, twitch_id: &str, session_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO live_markers (twitch_id, session_id) VALUES (?, ?)
        ON CONFLICT(twitch_id) DO UPDATE SET session_id = excluded.session_id
        "#,
    )
    .bind(twitch_id)
    .bind(session_id)
    .execute(db)
    .await?;
    Ok(())
}

/// Clear the marker for a subject (offline transition)
pub async fn delete_marker(db: &SqlitePool, twitch_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM live_markers WHERE twitch_id = ?")
        .bind(twitch_id)
        .execute(db)
        .await?;
    Ok(())
}
