// src/models/pipeline.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// --- Enums ---

/// Agrupamento grosso dos status, usado nos filtros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_phase", rename_all = "SCREAMING_SNAKE_CASE", no_pg_array)]
pub enum Phase {
    #[serde(rename = "contatto")]
    Contact,
    #[serde(rename = "analisi")]
    Analysis,
    #[serde(rename = "backoffice")]
    BackOffice,
    #[serde(rename = "trattativa")]
    Negotiation,
    #[serde(rename = "preventivo")]
    Quote,
    #[serde(rename = "perfezionamento")]
    Finalization,
    #[serde(rename = "chiusura")]
    Closing,
}

impl Phase {
    /// Fases em que o lead fica visível para o back-office.
    pub fn is_back_office(self) -> bool {
        matches!(self, Phase::BackOffice | Phase::Finalization)
    }

    pub fn back_office_phases() -> Vec<Phase> {
        vec![Phase::BackOffice, Phase::Finalization]
    }
}

// Permite `phase = ANY($1)` com um Vec<Phase>
impl sqlx::postgres::PgHasArrayType for Phase {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_lead_phase")
    }
}

// --- Status ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[schema(example = "nuovo")]
    pub id: String,
    #[schema(example = "Nuovo")]
    pub name: String,
    #[schema(example = "#3B82F6")]
    pub color: String,
    #[schema(example = 1)]
    pub position: i32,
    pub active: bool,
    pub phase: Phase,
    /// Status terminal (ganho/perdido): carimba `closedAt` no lead.
    pub closes_lead: bool,
    /// Próximos status recomendados. Vazio = sem recomendação.
    pub allowed_transitions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Status {
    /// Deriva o id a partir do nome: "Da Richiamare" -> "da_richiamare".
    pub fn slug(name: &str) -> String {
        name.trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
            .collect()
    }

    /// A lista de transições é só um conselho: nunca bloqueia, apenas avisa.
    pub fn check_transition(&self, to: &Status) -> TransitionCheck {
        if self.allowed_transitions.is_empty() || self.allowed_transitions.iter().any(|id| id == &to.id) {
            TransitionCheck::Allowed
        } else {
            TransitionCheck::NotRecommended {
                recommended: self.allowed_transitions.clone(),
            }
        }
    }
}

/// Resultado da verificação consultiva. Quem chama decide como apresentar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum TransitionCheck {
    Allowed,
    NotRecommended { recommended: Vec<String> },
}

impl TransitionCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TransitionCheck::Allowed)
    }
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewStatus {
    #[validate(length(min = 1, max = 60, message = "O nome deve ter entre 1 e 60 caracteres"))]
    #[schema(example = "Da Richiamare")]
    pub name: String,
    #[validate(length(min = 4, max = 9, message = "Cor inválida"))]
    #[schema(example = "#F59E0B")]
    pub color: String,
    pub phase: Phase,
    #[serde(default)]
    pub closes_lead: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[validate(length(min = 1, max = 60, message = "O nome deve ter entre 1 e 60 caracteres"))]
    pub name: Option<String>,
    #[validate(length(min = 4, max = 9, message = "Cor inválida"))]
    pub color: Option<String>,
    pub phase: Option<Phase>,
    pub closes_lead: Option<bool>,
    pub allowed_transitions: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: &str, allowed: &[&str]) -> Status {
        Status {
            id: id.into(),
            name: id.into(),
            color: "#000000".into(),
            position: 1,
            active: true,
            phase: Phase::Contact,
            closes_lead: false,
            allowed_transitions: allowed.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn slug_normalizes_names() {
        assert_eq!(Status::slug("Da Richiamare"), "da_richiamare");
        assert_eq!(Status::slug("  Contratto   Firmato! "), "contratto_firmato");
        assert_eq!(Status::slug("Fase 2 (bis)"), "fase_2_bis");
    }

    #[test]
    fn empty_hint_list_allows_everything() {
        let from = status("nuovo", &[]);
        assert!(from.check_transition(&status("perso", &[])).is_allowed());
    }

    #[test]
    fn unlisted_target_is_not_recommended() {
        let from = status("nuovo", &["contattato"]);
        assert!(from.check_transition(&status("contattato", &[])).is_allowed());
        assert_eq!(
            from.check_transition(&status("venduto", &[])),
            TransitionCheck::NotRecommended { recommended: vec!["contattato".into()] }
        );
    }

    #[test]
    fn phase_serializes_with_pipeline_names() {
        assert_eq!(serde_json::to_string(&Phase::Closing).unwrap(), "\"chiusura\"");
        assert!(Phase::Finalization.is_back_office());
        assert!(!Phase::Negotiation.is_back_office());
    }
}
