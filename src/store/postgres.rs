use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::AnnouncementStore;
use crate::error::{AnnouncementError, Result};
use crate::models::announcement::{Announcement, Draft, RecipientSet};
use crate::models::role::Role;

/// Explicit column list shared by every query.
const ANNOUNCEMENT_COLS: &str = "id, title, message, sender_id, sender_role, sender_name,
     recipients, important, attachment, created_at";

/// Announcements stored in the hosted Postgres database.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// DB row struct. Roles are stored as TEXT and parsed on the way out.
#[derive(Debug, FromRow)]
struct AnnouncementRow {
    id: Uuid,
    title: String,
    message: String,
    sender_id: String,
    sender_role: String,
    sender_name: String,
    recipients: Vec<String>,
    important: bool,
    attachment: Option<String>,
    created_at: DateTime<Utc>,
}

impl AnnouncementRow {
    fn into_announcement(self) -> Result<Announcement> {
        let row = self;
        let sender_role = row.sender_role.parse::<Role>().map_err(|_| {
            AnnouncementError::MalformedResponse(format!(
                "announcement {} has unknown sender role {:?}",
                row.id, row.sender_role
            ))
        })?;
        let recipients = RecipientSet::parse_lenient(row.recipients.as_slice()).map_err(|e| {
            AnnouncementError::MalformedResponse(format!("announcement {}: {e}", row.id))
        })?;
        Ok(Announcement {
            id: row.id,
            title: row.title,
            message: row.message,
            sender_id: row.sender_id,
            sender_role,
            sender_name: row.sender_name,
            recipients,
            important: row.important,
            attachment: row.attachment,
            created_at: row.created_at,
            read_by: Default::default(),
        })
    }
}

fn db_error(e: sqlx::Error) -> AnnouncementError {
    tracing::warn!("announcement query failed: {e}");
    AnnouncementError::RemoteUnavailable(e.to_string())
}

#[async_trait]
impl AnnouncementStore for PgStore {
    async fn list(&self) -> Result<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {ANNOUNCEMENT_COLS} FROM announcements ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_announcement() {
                Ok(a) => Some(a),
                Err(e) => {
                    tracing::warn!("Skipping stored announcement: {e}");
                    None
                }
            })
            .collect())
    }

    async fn create(&self, draft: Draft) -> Result<Announcement> {
        draft.validate()?;
        // Normalize through the in-memory constructor so every backend stores the same shape
        let pending = draft.into_announcement(Uuid::new_v4(), Utc::now());

        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "INSERT INTO announcements
                 (id, title, message, sender_id, sender_role, sender_name, recipients, important, attachment)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {ANNOUNCEMENT_COLS}"
        ))
        .bind(pending.id)
        .bind(&pending.title)
        .bind(&pending.message)
        .bind(&pending.sender_id)
        .bind(pending.sender_role.as_str())
        .bind(&pending.sender_name)
        .bind(pending.recipients.to_tags())
        .bind(pending.important)
        .bind(&pending.attachment)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        row.into_announcement()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
