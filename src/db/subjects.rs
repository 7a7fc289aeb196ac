//! Subject registrations
//!
//! One registration per owner (the chat-platform user who linked their
//! Twitch account); re-linking replaces the previous registration.

use crate::Result;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

/// A registered creator being watched for live status
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct SubjectRegistration {
    /// Chat-platform user id of the registrant
    pub owner_id: String,
    /// Stable upstream subject id
    pub twitch_id: String,
    /// Canonical lowercase handle
    pub login: String,
    /// Optional display name for rendering
    pub display_name: Option<String>,
}

impl SubjectRegistration {
    /// Name to render in announcements: display name when known, else login
    pub fn render_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.login)
    }
}

/// Get the registration owned by one user
pub async fn get_subject(db: &SqlitePool, owner_id: &str) -> Result<Option<SubjectRegistration>> {
    let subject = sqlx::query_as::<_, SubjectRegistration>(
        "SELECT owner_id, twitch_id, login, display_name FROM subjects WHERE owner_id = ?",
    )
    .bind(owner_id)
    .fetch_optional(db)
    .await?;
    Ok(subject)
}

/// List all registrations in stable order
pub async fn list_subjects(db: &SqlitePool) -> Result<Vec<SubjectRegistration>> {
    let subjects = sqlx::query_as::<_, SubjectRegistration>(
        "SELECT owner_id, twitch_id, login, display_name FROM subjects ORDER BY owner_id",
    )
    .fetch_all(db)
    .await?;
    Ok(subjects)
}

/// Insert or replace a registration (one per owner)
pub async fn upsert_subject(db: &SqlitePool, subject: &SubjectRegistration) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO subjects (owner_id, twitch_id, login, display_name)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(owner_id) DO UPDATE SET
            twitch_id = excluded.twitch_id,
            login = excluded.login,
            display_name = excluded.display_name
        "#,
    )
    .bind(&subject.owner_id)
    .bind(&subject.twitch_id)
    .bind(&subject.login)
    .bind(&subject.display_name)
    .execute(db)
    .await?;
    Ok(())
}

/// Delete a registration; returns whether one existed
pub async fn delete_subject(db: &SqlitePool, owner_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM subjects WHERE owner_id = ?")
        .bind(owner_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
