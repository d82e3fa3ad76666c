// src/db/status_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    db::store::StatusStore,
    models::pipeline::Status,
};

const STATUS_COLUMNS: &str =
    "id, name, color, position, active, phase, closes_lead, allowed_transitions, created_at";

#[derive(Clone)]
pub struct StatusRepository {
    pool: PgPool,
}

impl StatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for StatusRepository {
    async fn list_statuses(&self) -> Result<Vec<Status>, AppError> {
        let statuses = sqlx::query_as::<_, Status>(&format!(
            "SELECT {STATUS_COLUMNS} FROM statuses ORDER BY position ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(statuses)
    }

    async fn get_status(&self, id: &str) -> Result<Option<Status>, AppError> {
        let status = sqlx::query_as::<_, Status>(&format!("SELECT {STATUS_COLUMNS} FROM statuses WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(status)
    }

    async fn insert_status(&self, status: &Status) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO statuses (id, name, color, position, active, phase, closes_lead, allowed_transitions, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&status.id)
        .bind(&status.name)
        .bind(&status.color)
        .bind(status.position)
        .bind(status.active)
        .bind(status.phase)
        .bind(status.closes_lead)
        .bind(&status.allowed_transitions)
        .bind(status.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || AppError::StatusAlreadyExists(status.id.clone())))?;
        Ok(())
    }

    async fn update_status(&self, status: &Status) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE statuses SET
                name = $2, color = $3, active = $4, phase = $5,
                closes_lead = $6, allowed_transitions = $7
            WHERE id = $1
            "#,
        )
        .bind(&status.id)
        .bind(&status.name)
        .bind(&status.color)
        .bind(status.active)
        .bind(status.phase)
        .bind(status.closes_lead)
        .bind(&status.allowed_transitions)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::StatusNotFound(status.id.clone()));
        }

        // A fase dos leads é sempre a do status: propaga a mudança
        let cascaded = sqlx::query("UPDATE leads SET phase = $2 WHERE status_id = $1 AND phase <> $2")
            .bind(&status.id)
            .bind(status.phase)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(cascaded)
    }

    async fn reorder_statuses(&self, ids: &[String]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for (index, id) in ids.iter().enumerate() {
            let result = sqlx::query("UPDATE statuses SET position = $2 WHERE id = $1")
                .bind(id)
                .bind(index as i32 + 1)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                // drop da transação desfaz as posições já gravadas
                return Err(AppError::StatusNotFound(id.clone()));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_and_reassign(&self, id: &str, fallback: &Status) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query("UPDATE leads SET status_id = $2, phase = $3 WHERE status_id = $1")
            .bind(id)
            .bind(&fallback.id)
            .bind(fallback.phase)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM statuses WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(AppError::StatusNotFound(id.to_string()));
        }

        tx.commit().await?;
        Ok(moved)
    }
}
