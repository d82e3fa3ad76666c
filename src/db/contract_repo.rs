// src/db/contract_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::ContractStore, models::contract::Contract};

const CONTRACT_COLUMNS: &str = r#"
    id, lead_id, consultant_id, brand, model, trim_level, monthly_payment, term_months, annual_km,
    down_payment, commission, provider, contract_number, notes, signed_on, expected_delivery,
    delivered_on, created_by, created_at, updated_at
"#;

#[derive(Clone)]
pub struct ContractRepository {
    pool: PgPool,
}

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContractStore for ContractRepository {
    async fn find_by_lead(&self, lead_id: Uuid) -> Result<Option<Contract>, AppError> {
        let contract = sqlx::query_as::<_, Contract>(&format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE lead_id = $1"))
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contract)
    }

    async fn insert_contract(&self, c: &Contract) -> Result<(), AppError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO contracts ({CONTRACT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#
        ))
        .bind(c.id)
        .bind(c.lead_id)
        .bind(c.consultant_id)
        .bind(&c.brand)
        .bind(&c.model)
        .bind(&c.trim_level)
        .bind(c.monthly_payment)
        .bind(c.term_months)
        .bind(c.annual_km)
        .bind(c.down_payment)
        .bind(c.commission)
        .bind(&c.provider)
        .bind(&c.contract_number)
        .bind(&c.notes)
        .bind(c.signed_on)
        .bind(c.expected_delivery)
        .bind(c.delivered_on)
        .bind(c.created_by)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_contract(&self, c: &Contract) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE contracts SET
                brand = $2, model = $3, trim_level = $4, monthly_payment = $5, term_months = $6,
                annual_km = $7, down_payment = $8, commission = $9, provider = $10,
                contract_number = $11, notes = $12, signed_on = $13, expected_delivery = $14,
                delivered_on = $15, updated_at = $16
            WHERE lead_id = $1
            "#,
        )
        .bind(c.lead_id)
        .bind(&c.brand)
        .bind(&c.model)
        .bind(&c.trim_level)
        .bind(c.monthly_payment)
        .bind(c.term_months)
        .bind(c.annual_km)
        .bind(c.down_payment)
        .bind(c.commission)
        .bind(&c.provider)
        .bind(&c.contract_number)
        .bind(&c.notes)
        .bind(c.signed_on)
        .bind(c.expected_delivery)
        .bind(c.delivered_on)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ContractNotFound);
        }
        Ok(())
    }
}
