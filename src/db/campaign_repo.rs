// src/db/campaign_repo.rs

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::CampaignStore,
    models::campaign::Campaign,
};

const CAMPAIGN_COLUMNS: &str = "id, name, source, active, distribution, counters, excluded, created_at";

/// Linha crua: os mapas vêm como JSONB e são validados antes de virar `Campaign`.
#[derive(Debug, FromRow)]
struct CampaignRow {
    id: Uuid,
    name: String,
    source: String,
    active: bool,
    distribution: Json<BTreeMap<String, i64>>,
    counters: Json<BTreeMap<String, i64>>,
    excluded: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

fn parse_key(campaign: Uuid, key: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(key)
        .map_err(|_| AppError::CorruptDocument(format!("campanha {campaign}: consultor '{key}' inválido")))
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = AppError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let mut distribution = BTreeMap::new();
        for (key, weight) in row.distribution.0 {
            let consultant = parse_key(row.id, &key)?;
            let weight = u32::try_from(weight)
                .ok()
                .filter(|w| *w <= 100)
                .ok_or_else(|| AppError::CorruptDocument(format!("campanha {}: peso {weight} fora de 0..=100", row.id)))?;
            distribution.insert(consultant, weight);
        }

        let mut counters = BTreeMap::new();
        for (key, count) in row.counters.0 {
            let consultant = parse_key(row.id, &key)?;
            let count = u64::try_from(count)
                .map_err(|_| AppError::CorruptDocument(format!("campanha {}: contador negativo", row.id)))?;
            counters.insert(consultant, count);
        }

        Ok(Campaign {
            id: row.id,
            name: row.name,
            source: row.source,
            active: row.active,
            distribution,
            counters,
            excluded: row.excluded.into_iter().collect::<BTreeSet<_>>(),
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignStore for CampaignRepository {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, AppError> {
        let rows = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Campaign::try_from).collect()
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Campaign::try_from).transpose()
    }

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), AppError> {
        let excluded: Vec<Uuid> = campaign.excluded.iter().copied().collect();
        sqlx::query(
            r#"
            INSERT INTO campaigns (id, name, source, active, distribution, counters, excluded, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(campaign.id)
        .bind(&campaign.name)
        .bind(&campaign.source)
        .bind(campaign.active)
        .bind(Json(&campaign.distribution))
        .bind(Json(&campaign.counters))
        .bind(&excluded)
        .bind(campaign.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_campaign(&self, campaign: &Campaign) -> Result<(), AppError> {
        let excluded: Vec<Uuid> = campaign.excluded.iter().copied().collect();
        let result = sqlx::query(
            r#"
            UPDATE campaigns SET
                name = $2, source = $3, active = $4, distribution = $5, excluded = $6
            WHERE id = $1
            "#,
        )
        .bind(campaign.id)
        .bind(&campaign.name)
        .bind(&campaign.source)
        .bind(campaign.active)
        .bind(Json(&campaign.distribution))
        .bind(&excluded)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::CampaignNotFound);
        }
        Ok(())
    }

    async fn increment_counter(&self, campaign_id: Uuid, consultant_id: Uuid) -> Result<Campaign, AppError> {
        // Um único UPDATE: sem leitura-modificação-escrita no cliente
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            UPDATE campaigns
            SET counters = jsonb_set(
                counters,
                ARRAY[$2::text],
                to_jsonb(COALESCE((counters ->> $2::text)::bigint, 0) + 1),
                true
            )
            WHERE id = $1
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(campaign_id)
        .bind(consultant_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::CampaignNotFound)?;
        Campaign::try_from(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(distribution: &[(&str, i64)], counters: &[(&str, i64)]) -> CampaignRow {
        CampaignRow {
            id: Uuid::new_v4(),
            name: "Promo".into(),
            source: "facebook".into(),
            active: true,
            distribution: Json(distribution.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
            counters: Json(counters.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
            excluded: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn valid_row_becomes_typed_campaign() {
        let a = Uuid::new_v4().to_string();
        let campaign = Campaign::try_from(row(&[(&a, 60)], &[(&a, 3)])).unwrap();
        let id = Uuid::parse_str(&a).unwrap();
        assert_eq!(campaign.distribution[&id], 60);
        assert_eq!(campaign.counter(&id), 3);
    }

    #[test]
    fn non_uuid_key_is_rejected_at_the_boundary() {
        let err = Campaign::try_from(row(&[("mario", 50)], &[])).unwrap_err();
        assert!(matches!(err, AppError::CorruptDocument(_)));
    }

    #[test]
    fn out_of_range_weight_is_rejected() {
        let a = Uuid::new_v4().to_string();
        assert!(Campaign::try_from(row(&[(&a, 140)], &[])).is_err());
        assert!(Campaign::try_from(row(&[(&a, 10)], &[(&a, -1)])).is_err());
    }
}
