// src/db/store.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        agenda::{Appointment, AppointmentFilter},
        announcement::Announcement,
        auth::User,
        backoffice::BoRequest,
        campaign::Campaign,
        contract::Contract,
        lead::{Document, Lead, LeadFilter, StatusChange},
        pipeline::Status,
        timeline::{TimeRange, TimelineEntry},
    },
};

// =========================================================================
//  GATEWAY DE PERSISTÊNCIA
//  Uma trait por coleção. Postgres em produção, memória nos testes.
// =========================================================================

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Grava o lead e a primeira entrada da timeline na mesma escrita.
    async fn insert_lead(&self, lead: &Lead, entry: &TimelineEntry) -> Result<(), AppError>;
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError>;
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError>;
    /// Campos editáveis + consultor + updated_at; `entry`, se houver, entra junto.
    async fn save_lead(&self, lead: &Lead, entry: Option<&TimelineEntry>) -> Result<(), AppError>;
    /// Status, fase, datas e a entrada `StatusChange` de forma atômica.
    async fn apply_status_change(
        &self,
        lead_id: Uuid,
        change: &StatusChange,
        entry: &TimelineEntry,
    ) -> Result<Lead, AppError>;
    /// Acrescenta uma entrada e atualiza `updated_at` do lead.
    async fn append_activity(&self, entry: &TimelineEntry) -> Result<(), AppError>;
    /// Lead + timeline + documentos + pedidos de back-office. `false` se não existia.
    async fn delete_cascade(&self, id: Uuid) -> Result<bool, AppError>;
    async fn add_document(&self, document: &Document, entry: &TimelineEntry) -> Result<(), AppError>;
    async fn list_documents(&self, lead_id: Uuid) -> Result<Vec<Document>, AppError>;
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Ordenados por `position`.
    async fn list_statuses(&self) -> Result<Vec<Status>, AppError>;
    async fn get_status(&self, id: &str) -> Result<Option<Status>, AppError>;
    async fn insert_status(&self, status: &Status) -> Result<(), AppError>;
    /// Regrava o status; se a fase mudou, propaga para os leads. Retorna leads afetados.
    async fn update_status(&self, status: &Status) -> Result<u64, AppError>;
    /// Renumera 1..n na ordem recebida, em lote.
    async fn reorder_statuses(&self, ids: &[String]) -> Result<(), AppError>;
    /// Move os leads para `fallback` e remove o status. Retorna leads movidos.
    async fn delete_and_reassign(&self, id: &str, fallback: &Status) -> Result<u64, AppError>;
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, AppError>;
    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, AppError>;
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), AppError>;
    /// Nome, fonte, ativo, distribuição e exclusões. Contadores não são tocados.
    async fn update_campaign(&self, campaign: &Campaign) -> Result<(), AppError>;
    /// Incremento atômico de um único contador. Nunca repetir em caso de falha.
    async fn increment_counter(&self, campaign_id: Uuid, consultant_id: Uuid) -> Result<Campaign, AppError>;
}

#[async_trait]
pub trait TimelineStore: Send + Sync {
    async fn append(&self, entry: &TimelineEntry) -> Result<(), AppError>;
    /// Mais recentes primeiro.
    async fn list_for_lead(&self, lead_id: Uuid, range: &TimeRange) -> Result<Vec<TimelineEntry>, AppError>;
    /// Todas as entradas do período, em ordem cronológica.
    async fn list_between(&self, range: &TimeRange) -> Result<Vec<TimelineEntry>, AppError>;
}

#[async_trait]
pub trait BackOfficeStore: Send + Sync {
    async fn insert_request(&self, request: &BoRequest, entry: &TimelineEntry) -> Result<(), AppError>;
    async fn get_request(&self, id: Uuid) -> Result<Option<BoRequest>, AppError>;
    async fn list_for_lead(&self, lead_id: Uuid) -> Result<Vec<BoRequest>, AppError>;
    /// Aguardando + em andamento.
    async fn list_open(&self) -> Result<Vec<BoRequest>, AppError>;
    /// Escrita condicional: só assume se ainda estiver aguardando. `None` caso contrário.
    async fn claim_if_waiting(
        &self,
        id: Uuid,
        handler_id: Uuid,
        handler_name: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<BoRequest>, AppError>;
    /// Conclui (só a partir de em andamento) e grava a entrada na timeline do lead.
    async fn complete(
        &self,
        id: Uuid,
        response: &str,
        at: DateTime<Utc>,
        entry: &TimelineEntry,
    ) -> Result<Option<BoRequest>, AppError>;
    async fn mark_read(&self, id: Uuid) -> Result<Option<BoRequest>, AppError>;
    async fn count_unread(&self, requester_id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn find_by_lead(&self, lead_id: Uuid) -> Result<Option<Contract>, AppError>;
    async fn insert_contract(&self, contract: &Contract) -> Result<(), AppError>;
    async fn update_contract(&self, contract: &Contract) -> Result<(), AppError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// `entry` vai para a timeline do lead vinculado, na mesma escrita.
    async fn insert_appointment(&self, appointment: &Appointment, entry: Option<&TimelineEntry>) -> Result<(), AppError>;
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, AppError>;
    /// Por início, mais cedo primeiro.
    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppError>;
    async fn update_appointment(&self, appointment: &Appointment, entry: Option<&TimelineEntry>) -> Result<(), AppError>;
    /// `false` se não existia.
    async fn delete_appointment(&self, id: Uuid, entry: Option<&TimelineEntry>) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn insert_announcement(&self, announcement: &Announcement) -> Result<(), AppError>;
    /// Mais recentes primeiro.
    async fn list_announcements(&self) -> Result<Vec<Announcement>, AppError>;
    /// Acrescenta o leitor uma única vez. `None` se o comunicado não existe.
    async fn mark_announcement_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Announcement>, AppError>;
    async fn count_unread_announcements(&self, user_id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn list_active_consultants(&self) -> Result<Vec<User>, AppError>;
}

/// Conjunto de stores injetado nos serviços.
#[derive(Clone)]
pub struct Stores {
    pub leads: Arc<dyn LeadStore>,
    pub statuses: Arc<dyn StatusStore>,
    pub campaigns: Arc<dyn CampaignStore>,
    pub timeline: Arc<dyn TimelineStore>,
    pub backoffice: Arc<dyn BackOfficeStore>,
    pub contracts: Arc<dyn ContractStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub announcements: Arc<dyn AnnouncementStore>,
    pub users: Arc<dyn UserStore>,
}
