// src/services/backoffice_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::ReadRetry},
    db::store::{BackOfficeStore, LeadStore},
    models::{
        auth::{Actor, Role},
        backoffice::{BoRequest, BoRequestState, NewBoRequest},
        lead::Lead,
        timeline::TimelineEntry,
    },
    services::lead_service::can_access,
};

/// Fluxo aguardando -> em andamento -> concluída entre consultor e back-office.
#[derive(Clone)]
pub struct BackOfficeService {
    requests: Arc<dyn BackOfficeStore>,
    leads: Arc<dyn LeadStore>,
    retry: ReadRetry,
}

impl BackOfficeService {
    pub fn new(requests: Arc<dyn BackOfficeStore>, leads: Arc<dyn LeadStore>, retry: ReadRetry) -> Self {
        Self { requests, leads, retry }
    }

    pub async fn create(&self, lead_id: Uuid, payload: NewBoRequest, actor: &Actor) -> Result<BoRequest, AppError> {
        let lead = self.accessible_lead(lead_id, actor).await?;

        let now = Utc::now();
        let note = payload.note.trim().to_string();
        let request = BoRequest {
            id: Uuid::new_v4(),
            lead_id: lead.id,
            request_type: payload.request_type,
            state: BoRequestState::Waiting,
            note: note.clone(),
            requester_id: actor.id,
            requester_name: actor.display_name.clone(),
            handler_id: None,
            handler_name: None,
            response: None,
            requested_at: now,
            claimed_at: None,
            responded_at: None,
            read_by_consultant: false,
        };
        let text = if note.is_empty() {
            format!("Richiesta {}", request.request_type.label())
        } else {
            format!("Richiesta {}: {}", request.request_type.label(), note)
        };
        let entry = TimelineEntry::bo_request(lead.id, actor, text).at(now);

        self.requests.insert_request(&request, &entry).await?;
        tracing::info!("Solicitação {} ({:?}) aberta para o lead {}", request.id, request.request_type, lead.id);
        Ok(request)
    }

    /// Assume a solicitação. Se outro operador chegou antes, `AlreadyClaimed`
    /// traz quem está com ela e nada é alterado.
    pub async fn claim(&self, id: Uuid, handler: &Actor) -> Result<BoRequest, AppError> {
        ensure_handler(handler)?;
        let request = self.get(id).await?;
        if request.state != BoRequestState::Waiting {
            return Err(already_claimed(&request));
        }

        match self
            .requests
            .claim_if_waiting(id, handler.id, &handler.display_name, Utc::now())
            .await?
        {
            Some(claimed) => {
                tracing::info!("Solicitação {} assumida por {}", id, handler.display_name);
                Ok(claimed)
            }
            // perdeu a corrida entre a leitura e a escrita
            None => Err(already_claimed(&self.get(id).await?)),
        }
    }

    /// Conclui com a resposta. A timeline do lead recebe a resposta e o
    /// consultor passa a ter uma não lida.
    pub async fn respond(&self, id: Uuid, response: &str, handler: &Actor) -> Result<BoRequest, AppError> {
        ensure_handler(handler)?;
        let request = self.get(id).await?;
        if request.state != BoRequestState::InProgress {
            return Err(AppError::InvalidRequestState);
        }
        if request.handler_id != Some(handler.id) && !handler.is_admin() {
            return Err(AppError::Forbidden);
        }

        let now = Utc::now();
        let response = response.trim();
        let entry = TimelineEntry::bo_response(
            request.lead_id,
            handler,
            format!("Risposta {}: {}", request.request_type.label(), response),
        )
        .at(now);

        let completed = self
            .requests
            .complete(id, response, now, &entry)
            .await?
            .ok_or(AppError::InvalidRequestState)?;
        tracing::info!("Solicitação {} respondida por {}", id, handler.display_name);
        Ok(completed)
    }

    pub async fn mark_read(&self, id: Uuid, actor: &Actor) -> Result<BoRequest, AppError> {
        let request = self.get(id).await?;
        if request.requester_id != actor.id && !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        self.requests.mark_read(id).await?.ok_or(AppError::RequestNotFound)
    }

    /// Fila de trabalho: aguardando antes de em andamento, mais antigas primeiro.
    pub async fn pending(&self) -> Result<Vec<BoRequest>, AppError> {
        let mut open = self.retry.run("solicitações abertas", || self.requests.list_open()).await?;
        open.sort_by(|a, b| a.state.cmp(&b.state).then(a.requested_at.cmp(&b.requested_at)));
        Ok(open)
    }

    pub async fn unread_count(&self, actor: &Actor) -> Result<u64, AppError> {
        self.retry.run("não lidas", || self.requests.count_unread(actor.id)).await
    }

    pub async fn list_for_lead(&self, lead_id: Uuid, actor: &Actor) -> Result<Vec<BoRequest>, AppError> {
        self.accessible_lead(lead_id, actor).await?;
        self.retry.run("solicitações do lead", || self.requests.list_for_lead(lead_id)).await
    }

    async fn get(&self, id: Uuid) -> Result<BoRequest, AppError> {
        self.retry
            .run("solicitação", || self.requests.get_request(id))
            .await?
            .ok_or(AppError::RequestNotFound)
    }

    async fn accessible_lead(&self, lead_id: Uuid, actor: &Actor) -> Result<Lead, AppError> {
        let lead = self
            .retry
            .run("lead", || self.leads.get_lead(lead_id))
            .await?
            .ok_or(AppError::LeadNotFound)?;
        if !can_access(actor, &lead) {
            return Err(AppError::Forbidden);
        }
        Ok(lead)
    }
}

fn ensure_handler(actor: &Actor) -> Result<(), AppError> {
    match actor.role {
        Role::BackOffice | Role::Admin => Ok(()),
        Role::Consultant => Err(AppError::Forbidden),
    }
}

fn already_claimed(request: &BoRequest) -> AppError {
    tracing::warn!(
        "Solicitação {} já está com {}",
        request.id,
        request.handler_name.as_deref().unwrap_or("-")
    );
    AppError::AlreadyClaimed {
        handler_id: request.handler_id,
        handler_name: request.handler_name.clone().unwrap_or_default(),
    }
}
