// src/models/lead.rs

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::pipeline::Phase;

// --- Enums ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "client_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    #[default]
    Private,
    Company,
    VatHolder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    IdentityDocument,
    TaxCode,
    Payslip,
    Other,
}

// --- Lead ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    #[schema(example = "Luca")]
    pub first_name: String,
    #[schema(example = "Bianchi")]
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "facebook")]
    pub source: Option<String>,
    pub campaign_id: Option<Uuid>,
    pub client_type: ClientType,
    pub consultant_id: Option<Uuid>,
    #[schema(example = "nuovo")]
    pub status_id: String,
    /// Sempre igual à fase do status atual; nunca é gravada sozinha.
    pub phase: Phase,
    pub priority: Priority,
    #[schema(example = "Fiat 500e")]
    pub requested_vehicle: Option<String>,
    pub needs: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// O que muda no lead quando o status muda.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status_id: String,
    pub phase: Phase,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

// --- Documentos (só metadados; o upload é de outro serviço) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub lead_id: Uuid,
    #[schema(example = "carta_identita.pdf")]
    pub name: String,
    pub url: String,
    pub kind: DocumentKind,
    pub uploaded_by: Uuid,
    pub uploaded_by_name: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    #[validate(length(min = 1, max = 255, message = "Nome do documento obrigatório"))]
    pub name: String,
    #[validate(url(message = "URL inválida"))]
    pub url: String,
    pub kind: DocumentKind,
}

// --- Payloads ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    #[validate(length(min = 1, max = 100, message = "Nome obrigatório"))]
    #[schema(example = "Luca")]
    pub first_name: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub last_name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 30, message = "Telefone inválido"))]
    pub phone: Option<String>,
    pub source: Option<String>,
    pub campaign_id: Option<Uuid>,
    pub client_type: Option<ClientType>,
    pub priority: Option<Priority>,
    pub requested_vehicle: Option<String>,
    pub needs: Option<String>,
    pub notes: Option<String>,
    /// Só o admin escolhe o consultor na criação manual.
    pub consultant_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdate {
    #[validate(length(min = 1, max = 100, message = "Nome obrigatório"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 30, message = "Telefone inválido"))]
    pub phone: Option<String>,
    pub source: Option<String>,
    pub client_type: Option<ClientType>,
    pub priority: Option<Priority>,
    pub requested_vehicle: Option<String>,
    pub needs: Option<String>,
    pub notes: Option<String>,
}

impl LeadUpdate {
    pub fn apply_to(self, lead: &mut Lead) {
        if let Some(v) = self.first_name { lead.first_name = v; }
        if let Some(v) = self.last_name { lead.last_name = v; }
        if let Some(v) = self.email { lead.email = Some(v); }
        if let Some(v) = self.phone { lead.phone = Some(v); }
        if let Some(v) = self.source { lead.source = Some(v); }
        if let Some(v) = self.client_type { lead.client_type = v; }
        if let Some(v) = self.priority { lead.priority = v; }
        if let Some(v) = self.requested_vehicle { lead.requested_vehicle = Some(v); }
        if let Some(v) = self.needs { lead.needs = Some(v); }
        if let Some(v) = self.notes { lead.notes = Some(v); }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReassignPayload {
    pub consultant_id: Uuid,
}

/// Mudança de status pedida por lista, ficha do lead ou kanban.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangePayload {
    #[validate(length(min = 1, message = "Status obrigatório"))]
    #[schema(example = "contattato")]
    pub status_id: String,
    /// Confirma uma transição fora das recomendadas.
    #[serde(default)]
    pub force: bool,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

/// Lote vindo do adaptador de planilhas: cada linha vira um `ingest`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportPayload {
    pub campaign_id: Uuid,
    #[validate(length(min = 1, max = 5000, message = "O arquivo não tem linhas"))]
    pub rows: Vec<NewLead>,
}

// --- Filtros ---

/// Janela de criação usada nas listas e no kanban.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    All,
    Month,
    Quarter,
}

impl Period {
    /// Início da janela: primeiro dia do mês corrente, ou do mês de dois meses atrás.
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let month_start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()?;
        match self {
            Period::All => None,
            Period::Month => Some(month_start),
            Period::Quarter => month_start.checked_sub_months(Months::new(2)),
        }
    }
}

/// Filtro já resolvido (escopo do perfil aplicado) que vai para o store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub consultant_id: Option<Uuid>,
    pub phases: Option<Vec<Phase>>,
    pub status_id: Option<String>,
    pub created_since: Option<DateTime<Utc>>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        self.consultant_id.is_none_or(|c| lead.consultant_id == Some(c))
            && self.phases.as_ref().is_none_or(|p| p.contains(&lead.phase))
            && self.status_id.as_ref().is_none_or(|s| &lead.status_id == s)
            && self.created_since.is_none_or(|t| lead.created_at >= t)
    }
}

/// Query string das listas de leads.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeadQuery {
    pub period: Option<Period>,
    pub consultant_id: Option<Uuid>,
    pub status: Option<String>,
    pub phase: Option<Phase>,
}

// --- Resultados de operações em lote ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub lead: Lead,
    /// Preenchido quando a campanha não tinha consultor disponível.
    pub unassigned_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub unassigned: usize,
    pub failed: Vec<ImportFailure>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteFailure {
    pub id: Uuid,
    pub reason: String,
}

/// "X removidos, Y falharam": nunca desfaz o que já foi removido.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteReport {
    pub deleted: Vec<Uuid>,
    pub failed: Vec<BulkDeleteFailure>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeletePayload {
    #[validate(length(min = 1, message = "Selecione ao menos um lead"))]
    pub ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_starts_two_months_back() {
        let now = Utc.with_ymd_and_hms(2026, 3, 17, 10, 30, 0).unwrap();
        assert_eq!(Period::All.since(now), None);
        assert_eq!(Period::Month.since(now), Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single());
        assert_eq!(Period::Quarter.since(now), Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single());
    }

    #[test]
    fn quarter_crosses_year_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(Period::Quarter.since(now), Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).single());
    }

    #[test]
    fn invalid_email_is_rejected() {
        let payload = NewLead {
            first_name: "Luca".into(),
            email: Some("non-una-mail".into()),
            ..Default::default()
        };
        assert!(payload.validate().is_err());
    }
}
