// src/models/campaign.rs

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    #[schema(example = "Promo Primavera")]
    pub name: String,
    #[schema(example = "facebook")]
    pub source: String,
    pub active: bool,
    /// Consultor -> percentual inteiro. Os não excluídos somam 100.
    #[schema(value_type = Object)]
    pub distribution: BTreeMap<Uuid, u32>,
    /// Consultor -> leads atribuídos até agora.
    #[schema(value_type = Object)]
    pub counters: BTreeMap<Uuid, u64>,
    /// Excluídos temporariamente (ex.: férias).
    #[schema(value_type = Vec<Uuid>)]
    pub excluded: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn counter(&self, consultant_id: &Uuid) -> u64 {
        self.counters.get(consultant_id).copied().unwrap_or(0)
    }
}

/// Peso efetivo de um consultor depois da renormalização.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveShare {
    pub consultant_id: Uuid,
    pub configured: u32,
    pub effective_percent: f64,
    pub assigned: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter no mínimo 2 caracteres"))]
    pub name: String,
    #[validate(length(min = 1, max = 60, message = "Fonte obrigatória"))]
    pub source: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter no mínimo 2 caracteres"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 60, message = "Fonte obrigatória"))]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributionPayload {
    #[schema(value_type = Object)]
    pub distribution: BTreeMap<Uuid, u32>,
    #[serde(default)]
    #[schema(value_type = Vec<Uuid>)]
    pub excluded: BTreeSet<Uuid>,
}
