// src/db/backoffice_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::map_fk_violation, error::AppError},
    db::{store::BackOfficeStore, LeadRepository},
    models::{backoffice::BoRequest, timeline::TimelineEntry},
};

const REQUEST_COLUMNS: &str = r#"
    id, lead_id, request_type, state, note, requester_id, requester_name,
    handler_id, handler_name, response, requested_at, claimed_at, responded_at, read_by_consultant
"#;

#[derive(Clone)]
pub struct BackOfficeRepository {
    pool: PgPool,
}

impl BackOfficeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BackOfficeStore for BackOfficeRepository {
    async fn insert_request(&self, request: &BoRequest, entry: &TimelineEntry) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO bo_requests ({REQUEST_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#
        ))
        .bind(request.id)
        .bind(request.lead_id)
        .bind(request.request_type)
        .bind(request.state)
        .bind(&request.note)
        .bind(request.requester_id)
        .bind(&request.requester_name)
        .bind(request.handler_id)
        .bind(&request.handler_name)
        .bind(&request.response)
        .bind(request.requested_at)
        .bind(request.claimed_at)
        .bind(request.responded_at)
        .bind(request.read_by_consultant)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_fk_violation(e, || AppError::LeadNotFound))?;

        LeadRepository::insert_entry(&mut tx, entry).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<BoRequest>, AppError> {
        let request = sqlx::query_as::<_, BoRequest>(&format!("SELECT {REQUEST_COLUMNS} FROM bo_requests WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(request)
    }

    async fn list_for_lead(&self, lead_id: Uuid) -> Result<Vec<BoRequest>, AppError> {
        let requests = sqlx::query_as::<_, BoRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM bo_requests WHERE lead_id = $1 ORDER BY requested_at DESC"
        ))
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn list_open(&self) -> Result<Vec<BoRequest>, AppError> {
        let requests = sqlx::query_as::<_, BoRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM bo_requests WHERE state <> 'COMPLETED' ORDER BY requested_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn claim_if_waiting(
        &self,
        id: Uuid,
        handler_id: Uuid,
        handler_name: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<BoRequest>, AppError> {
        // Condição no WHERE: duas tentativas simultâneas não assumem a mesma solicitação
        let request = sqlx::query_as::<_, BoRequest>(&format!(
            r#"
            UPDATE bo_requests SET
                state = 'IN_PROGRESS', handler_id = $2, handler_name = $3, claimed_at = $4
            WHERE id = $1 AND state = 'WAITING'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(handler_id)
        .bind(handler_name)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn complete(
        &self,
        id: Uuid,
        response: &str,
        at: DateTime<Utc>,
        entry: &TimelineEntry,
    ) -> Result<Option<BoRequest>, AppError> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, BoRequest>(&format!(
            r#"
            UPDATE bo_requests SET
                state = 'COMPLETED', response = $2, responded_at = $3, read_by_consultant = FALSE
            WHERE id = $1 AND state = 'IN_PROGRESS'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(response)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = request else {
            return Ok(None);
        };

        sqlx::query("UPDATE leads SET updated_at = $2 WHERE id = $1")
            .bind(request.lead_id)
            .bind(at)
            .execute(&mut *tx)
            .await?;
        LeadRepository::insert_entry(&mut tx, entry).await?;

        tx.commit().await?;
        Ok(Some(request))
    }

    async fn mark_read(&self, id: Uuid) -> Result<Option<BoRequest>, AppError> {
        let request = sqlx::query_as::<_, BoRequest>(&format!(
            "UPDATE bo_requests SET read_by_consultant = TRUE WHERE id = $1 RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn count_unread(&self, requester_id: Uuid) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bo_requests
            WHERE requester_id = $1 AND state = 'COMPLETED' AND read_by_consultant = FALSE
            "#,
        )
        .bind(requester_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }
}
