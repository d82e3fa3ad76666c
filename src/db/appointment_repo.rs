// src/db/appointment_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_fk_violation, error::AppError},
    db::{store::AppointmentStore, LeadRepository},
    models::{
        agenda::{Appointment, AppointmentFilter},
        timeline::TimelineEntry,
    },
};

const APPOINTMENT_COLUMNS: &str = r#"
    id, kind, title, description, starts_at, duration_minutes, lead_id, lead_name,
    owner_id, owner_name, completed, created_at, updated_at
"#;

#[derive(Clone)]
pub struct AppointmentRepository {
    pool: PgPool,
}

impl AppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentStore for AppointmentRepository {
    async fn insert_appointment(&self, appointment: &Appointment, entry: Option<&TimelineEntry>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO appointments ({APPOINTMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#
        ))
        .bind(appointment.id)
        .bind(appointment.kind)
        .bind(&appointment.title)
        .bind(&appointment.description)
        .bind(appointment.starts_at)
        .bind(appointment.duration_minutes)
        .bind(appointment.lead_id)
        .bind(&appointment.lead_name)
        .bind(appointment.owner_id)
        .bind(&appointment.owner_name)
        .bind(appointment.completed)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_fk_violation(e, || AppError::LeadNotFound))?;

        if let Some(entry) = entry {
            LeadRepository::insert_entry(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(appointment)
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE TRUE"));
        if let Some(owner_id) = filter.owner_id {
            query.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(from) = filter.range.from {
            query.push(" AND starts_at >= ").push_bind(from);
        }
        if let Some(to) = filter.range.to {
            query.push(" AND starts_at < ").push_bind(to);
        }
        query.push(" ORDER BY starts_at ASC, created_at ASC");

        let appointments = query.build_query_as::<Appointment>().fetch_all(&self.pool).await?;
        Ok(appointments)
    }

    async fn update_appointment(&self, appointment: &Appointment, entry: Option<&TimelineEntry>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE appointments SET
                kind = $2, title = $3, description = $4, starts_at = $5, duration_minutes = $6,
                lead_id = $7, lead_name = $8, completed = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.kind)
        .bind(&appointment.title)
        .bind(&appointment.description)
        .bind(appointment.starts_at)
        .bind(appointment.duration_minutes)
        .bind(appointment.lead_id)
        .bind(&appointment.lead_name)
        .bind(appointment.completed)
        .bind(appointment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_fk_violation(e, || AppError::LeadNotFound))?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::AppointmentNotFound);
        }
        if let Some(entry) = entry {
            LeadRepository::insert_entry(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_appointment(&self, id: Uuid, entry: Option<&TimelineEntry>) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted > 0 {
            if let Some(entry) = entry {
                LeadRepository::insert_entry(&mut tx, entry).await?;
            }
        }

        tx.commit().await?;
        Ok(deleted > 0)
    }
}
