// src/db/lead_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_fk_violation, error::AppError},
    db::store::LeadStore,
    models::{
        lead::{Document, Lead, LeadFilter, StatusChange},
        timeline::TimelineEntry,
    },
};

const LEAD_COLUMNS: &str = r#"
    id, first_name, last_name, email, phone, source, campaign_id, client_type,
    consultant_id, status_id, phase, priority, requested_vehicle, needs, notes,
    created_at, updated_at, closed_at
"#;

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Usado também pelos outros repositórios que escrevem na timeline dentro da própria transação.
    pub(crate) async fn insert_entry(
        tx: &mut Transaction<'_, Postgres>,
        entry: &TimelineEntry,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO timeline_entries (
                id, lead_id, kind, author_id, author_name, note, old_status, new_status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.lead_id)
        .bind(entry.kind)
        .bind(entry.author_id)
        .bind(&entry.author_name)
        .bind(&entry.note)
        .bind(&entry.old_status)
        .bind(&entry.new_status)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_fk_violation(e, || AppError::LeadNotFound))?;
        Ok(())
    }
}

#[async_trait]
impl LeadStore for LeadRepository {
    async fn insert_lead(&self, lead: &Lead, entry: &TimelineEntry) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO leads (
                id, first_name, last_name, email, phone, source, campaign_id, client_type,
                consultant_id, status_id, phase, priority, requested_vehicle, needs, notes,
                created_at, updated_at, closed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(lead.id)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.source)
        .bind(lead.campaign_id)
        .bind(lead.client_type)
        .bind(lead.consultant_id)
        .bind(&lead.status_id)
        .bind(lead.phase)
        .bind(lead.priority)
        .bind(&lead.requested_vehicle)
        .bind(&lead.needs)
        .bind(&lead.notes)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .bind(lead.closed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_fk_violation(e, || AppError::StatusNotFound(lead.status_id.clone())))?;

        Self::insert_entry(&mut tx, entry).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>(&format!(
            r#"
            SELECT {LEAD_COLUMNS}
            FROM leads
            WHERE ($1::uuid IS NULL OR consultant_id = $1)
              AND ($2::lead_phase[] IS NULL OR phase = ANY($2))
              AND ($3::text IS NULL OR status_id = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
            ORDER BY created_at DESC, id
            "#
        ))
        .bind(filter.consultant_id)
        .bind(filter.phases.as_deref())
        .bind(filter.status_id.as_deref())
        .bind(filter.created_since)
        .fetch_all(&self.pool)
        .await?;
        Ok(leads)
    }

    async fn save_lead(&self, lead: &Lead, entry: Option<&TimelineEntry>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // status_id/phase/closed_at ficam de fora: só mudam via apply_status_change
        let result = sqlx::query(
            r#"
            UPDATE leads SET
                first_name = $2, last_name = $3, email = $4, phone = $5, source = $6,
                client_type = $7, consultant_id = $8, priority = $9,
                requested_vehicle = $10, needs = $11, notes = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(lead.id)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.source)
        .bind(lead.client_type)
        .bind(lead.consultant_id)
        .bind(lead.priority)
        .bind(&lead.requested_vehicle)
        .bind(&lead.needs)
        .bind(&lead.notes)
        .bind(lead.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::LeadNotFound);
        }
        if let Some(entry) = entry {
            Self::insert_entry(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn apply_status_change(
        &self,
        lead_id: Uuid,
        change: &StatusChange,
        entry: &TimelineEntry,
    ) -> Result<Lead, AppError> {
        let mut tx = self.pool.begin().await?;

        let lead = sqlx::query_as::<_, Lead>(&format!(
            r#"
            UPDATE leads SET
                status_id = $2, phase = $3, updated_at = $4,
                closed_at = COALESCE($5, closed_at)
            WHERE id = $1
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(lead_id)
        .bind(&change.status_id)
        .bind(change.phase)
        .bind(change.updated_at)
        .bind(change.closed_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_fk_violation(e, || AppError::StatusNotFound(change.status_id.clone())))?
        .ok_or(AppError::LeadNotFound)?;

        Self::insert_entry(&mut tx, entry).await?;

        tx.commit().await?;
        Ok(lead)
    }

    async fn append_activity(&self, entry: &TimelineEntry) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE leads SET updated_at = $2 WHERE id = $1")
            .bind(entry.lead_id)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::LeadNotFound);
        }
        Self::insert_entry(&mut tx, entry).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_cascade(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        for table in ["timeline_entries", "lead_documents", "bo_requests"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE lead_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        let deleted = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn add_document(&self, document: &Document, entry: &TimelineEntry) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO lead_documents (id, lead_id, name, url, kind, uploaded_by, uploaded_by_name, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(document.id)
        .bind(document.lead_id)
        .bind(&document.name)
        .bind(&document.url)
        .bind(document.kind)
        .bind(document.uploaded_by)
        .bind(&document.uploaded_by_name)
        .bind(document.uploaded_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_fk_violation(e, || AppError::LeadNotFound))?;

        sqlx::query("UPDATE leads SET updated_at = $2 WHERE id = $1")
            .bind(document.lead_id)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        Self::insert_entry(&mut tx, entry).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_documents(&self, lead_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, lead_id, name, url, kind, uploaded_by, uploaded_by_name, uploaded_at
            FROM lead_documents
            WHERE lead_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }
}
