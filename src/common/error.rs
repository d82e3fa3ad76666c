// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Taxonomia de erros do núcleo (distribuição, pipeline, back-office) + fronteira HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Nenhum consultor disponível para a campanha")]
    NoAvailableConsultant,

    #[error("Solicitação já assumida por {handler_name}")]
    AlreadyClaimed {
        handler_id: Option<Uuid>,
        handler_name: String,
    },

    #[error("Transição {from} -> {to} não recomendada")]
    TransitionRejectedAdvisory {
        from: String,
        to: String,
        recommended: Vec<String>,
    },

    #[error("O lead já está no status {0}")]
    TransitionNoop(String),

    #[error("Persistência indisponível")]
    PersistenceUnavailable,

    #[error("Lead não encontrado")]
    LeadNotFound,

    #[error("Status '{0}' não encontrado")]
    StatusNotFound(String),

    #[error("Status '{0}' está desativado")]
    StatusInactive(String),

    #[error("Status '{0}' já existe")]
    StatusAlreadyExists(String),

    #[error("O status padrão '{0}' não pode ser removido nem desativado")]
    DefaultStatusLocked(String),

    #[error("O status de venda '{0}' não pode ser removido nem desativado")]
    SoldStatusLocked(String),

    #[error("Campanha não encontrada")]
    CampaignNotFound,

    #[error("Campanha desativada")]
    CampaignInactive,

    #[error("Distribuição inválida: {0}")]
    InvalidDistribution(String),

    #[error("Solicitação de back-office não encontrada")]
    RequestNotFound,

    #[error("Solicitação em estado inválido para esta operação")]
    InvalidRequestState,

    #[error("Contrato não encontrado")]
    ContractNotFound,

    #[error("Compromisso não encontrado")]
    AppointmentNotFound,

    #[error("Comunicado não encontrado")]
    AnnouncementNotFound,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Ação não permitida para este perfil")]
    Forbidden,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Documento corrompido no armazenamento: {0}")]
    CorruptDocument(String),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[source] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

// Erros de conexão/pool viram PersistenceUnavailable; o resto é erro de banco.
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::WorkerCrashed => AppError::PersistenceUnavailable,
            other => AppError::DatabaseError(other),
        }
    }
}

impl AppError {
    /// Erro de validação em um único campo, no mesmo formato do `validator`.
    pub fn invalid_field(field: &'static str, message: &str) -> Self {
        let mut errors = validator::ValidationErrors::new();
        let mut err = validator::ValidationError::new("invalid");
        err.message = Some(message.to_string().into());
        errors.add(field, err);
        AppError::ValidationError(errors)
    }

    /// Código estável usado pelo frontend e como chave do catálogo i18n.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::NoAvailableConsultant => "no_available_consultant",
            AppError::AlreadyClaimed { .. } => "already_claimed",
            AppError::TransitionRejectedAdvisory { .. } => "transition_rejected_advisory",
            AppError::TransitionNoop(_) => "transition_noop",
            AppError::PersistenceUnavailable => "persistence_unavailable",
            AppError::LeadNotFound => "lead_not_found",
            AppError::StatusNotFound(_) => "status_not_found",
            AppError::StatusInactive(_) => "status_inactive",
            AppError::StatusAlreadyExists(_) => "status_already_exists",
            AppError::DefaultStatusLocked(_) => "default_status_locked",
            AppError::SoldStatusLocked(_) => "sold_status_locked",
            AppError::CampaignNotFound => "campaign_not_found",
            AppError::CampaignInactive => "campaign_inactive",
            AppError::InvalidDistribution(_) => "invalid_distribution",
            AppError::RequestNotFound => "request_not_found",
            AppError::InvalidRequestState => "invalid_request_state",
            AppError::ContractNotFound => "contract_not_found",
            AppError::AppointmentNotFound => "appointment_not_found",
            AppError::AnnouncementNotFound => "announcement_not_found",
            AppError::UserNotFound => "user_not_found",
            AppError::Forbidden => "forbidden",
            AppError::InvalidToken => "invalid_token",
            AppError::CorruptDocument(_) => "internal_error",
            AppError::DatabaseError(_) => "internal_error",
            AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::TransitionNoop(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::LeadNotFound
            | AppError::StatusNotFound(_)
            | AppError::CampaignNotFound
            | AppError::RequestNotFound
            | AppError::ContractNotFound
            | AppError::AppointmentNotFound
            | AppError::AnnouncementNotFound
            | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyClaimed { .. }
            | AppError::TransitionRejectedAdvisory { .. }
            | AppError::StatusAlreadyExists(_)
            | AppError::InvalidRequestState
            | AppError::DefaultStatusLocked(_)
            | AppError::SoldStatusLocked(_) => StatusCode::CONFLICT,
            AppError::NoAvailableConsultant
            | AppError::InvalidDistribution(_)
            | AppError::CampaignInactive
            | AppError::StatusInactive(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PersistenceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CorruptDocument(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Falhas transitórias: só leituras idempotentes podem ser repetidas.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::PersistenceUnavailable)
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::AlreadyClaimed { handler_id, handler_name } => Some(json!({
                "handlerId": handler_id,
                "handlerName": handler_name,
            })),
            AppError::TransitionRejectedAdvisory { from, to, recommended } => Some(json!({
                "from": from,
                "to": to,
                "recommended": recommended,
            })),
            AppError::InvalidDistribution(reason) => Some(json!({ "reason": reason })),
            AppError::StatusNotFound(id)
            | AppError::StatusInactive(id)
            | AppError::StatusAlreadyExists(id)
            | AppError::DefaultStatusLocked(id)
            | AppError::SoldStatusLocked(id)
            | AppError::TransitionNoop(id) => Some(json!({ "statusId": id })),
            _ => None,
        }
    }

    /// Converte para a resposta HTTP traduzida no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }
        ApiError {
            status,
            code: self.code().to_string(),
            error: i18n.message(&locale.0, self.code()),
            details: self.details(),
        }
    }
}

// Resposta de erro que sai pela API
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

// Usado pelos middlewares, onde ainda não temos o idioma resolvido.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }
        ApiError {
            status,
            code: self.code().to_string(),
            error: self.to_string(),
            details: self.details(),
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_claimed_is_a_conflict_with_claimant_details() {
        let err = AppError::AlreadyClaimed {
            handler_id: None,
            handler_name: "Giulia Bianchi".into(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "already_claimed");
        let details = err.details().unwrap();
        assert_eq!(details["handlerName"], "Giulia Bianchi");
    }

    #[test]
    fn pool_timeouts_become_persistence_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::PersistenceUnavailable));
        assert!(err.is_transient());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn row_not_found_is_not_transient() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(!err.is_transient());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn translated_error_uses_locale_catalog() {
        let i18n = I18nStore::load().unwrap();
        let api = AppError::NoAvailableConsultant.to_api_error(&Locale("en".into()), &i18n);
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.code, "no_available_consultant");
        assert!(!api.error.is_empty());
        assert_ne!(api.error, "no_available_consultant");
    }
}
