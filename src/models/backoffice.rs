// src/models/backoffice.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "bo_request_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum BoRequestType {
    Quote,
    Consultation,
    Feasibility,
}

impl BoRequestType {
    pub fn label(self) -> &'static str {
        match self {
            BoRequestType::Quote => "Preventivo",
            BoRequestType::Consultation => "Consulenza",
            BoRequestType::Feasibility => "Fattibilità",
        }
    }
}

// A ordem das variantes define a fila: aguardando antes de em andamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "bo_request_state", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum BoRequestState {
    Waiting,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoRequest {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub request_type: BoRequestType,
    pub state: BoRequestState,
    pub note: String,
    pub requester_id: Uuid,
    pub requester_name: String,
    pub handler_id: Option<Uuid>,
    pub handler_name: Option<String>,
    pub response: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub read_by_consultant: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewBoRequest {
    pub request_type: BoRequestType,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoResponsePayload {
    #[validate(length(min = 1, max = 4000, message = "A resposta não pode ser vazia"))]
    pub response: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread: u64,
}
