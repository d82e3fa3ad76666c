// src/db/timeline_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::map_fk_violation, error::AppError},
    db::store::TimelineStore,
    models::timeline::{TimeRange, TimelineEntry},
};

const ENTRY_COLUMNS: &str =
    "id, lead_id, kind, author_id, author_name, note, old_status, new_status, created_at";

// Só INSERT e SELECT: a timeline é append-only
#[derive(Clone)]
pub struct TimelineRepository {
    pool: PgPool,
}

impl TimelineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TimelineStore for TimelineRepository {
    async fn append(&self, entry: &TimelineEntry) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO timeline_entries ({ENTRY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(entry.id)
        .bind(entry.lead_id)
        .bind(entry.kind)
        .bind(entry.author_id)
        .bind(&entry.author_name)
        .bind(&entry.note)
        .bind(&entry.old_status)
        .bind(&entry.new_status)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_fk_violation(e, || AppError::LeadNotFound))?;
        Ok(())
    }

    async fn list_for_lead(&self, lead_id: Uuid, range: &TimeRange) -> Result<Vec<TimelineEntry>, AppError> {
        let entries = sqlx::query_as::<_, TimelineEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM timeline_entries
            WHERE lead_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC, seq DESC
            "#
        ))
        .bind(lead_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn list_between(&self, range: &TimeRange) -> Result<Vec<TimelineEntry>, AppError> {
        let entries = sqlx::query_as::<_, TimelineEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM timeline_entries
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at < $2)
            ORDER BY created_at ASC, seq ASC
            "#
        ))
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
