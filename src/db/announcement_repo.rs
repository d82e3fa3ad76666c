// src/db/announcement_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::AnnouncementStore,
    models::announcement::Announcement,
};

const ANNOUNCEMENT_COLUMNS: &str = "id, title, message, author_id, author_name, created_at, read_by";

#[derive(Clone)]
pub struct AnnouncementRepository {
    pool: PgPool,
}

impl AnnouncementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnnouncementStore for AnnouncementRepository {
    async fn insert_announcement(&self, announcement: &Announcement) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO announcements ({ANNOUNCEMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(announcement.id)
        .bind(&announcement.title)
        .bind(&announcement.message)
        .bind(announcement.author_id)
        .bind(&announcement.author_name)
        .bind(announcement.created_at)
        .bind(&announcement.read_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_announcements(&self) -> Result<Vec<Announcement>, AppError> {
        let announcements = sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(announcements)
    }

    async fn mark_announcement_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Announcement>, AppError> {
        // Só acrescenta se ainda não estiver lá
        let announcement = sqlx::query_as::<_, Announcement>(&format!(
            r#"
            UPDATE announcements SET
                read_by = CASE WHEN $2 = ANY(read_by) THEN read_by ELSE array_append(read_by, $2) END
            WHERE id = $1
            RETURNING {ANNOUNCEMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(announcement)
    }

    async fn count_unread_announcements(&self, user_id: Uuid) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM announcements WHERE NOT ($1 = ANY(read_by))")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
