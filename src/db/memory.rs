// src/db/memory.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{
        AnnouncementStore, AppointmentStore, BackOfficeStore, CampaignStore, ContractStore, LeadStore,
        StatusStore, Stores, TimelineStore, UserStore,
    },
    models::{
        agenda::{Appointment, AppointmentFilter},
        announcement::Announcement,
        auth::{Role, User},
        backoffice::{BoRequest, BoRequestState},
        campaign::Campaign,
        contract::Contract,
        lead::{Document, Lead, LeadFilter, StatusChange},
        pipeline::{Phase, Status},
        timeline::{TimeRange, TimelineEntry},
    },
};

/// Pipeline padrão: (id, nome, cor, fase, encerra o lead).
pub const DEFAULT_PIPELINE: &[(&str, &str, &str, Phase, bool)] = &[
    ("nuovo", "Nuovo", "#3B82F6", Phase::Contact, false),
    ("contattato", "Contattato", "#6366F1", Phase::Contact, false),
    ("in_analisi", "In Analisi", "#8B5CF6", Phase::Analysis, false),
    ("in_attesa_documenti", "In Attesa Documenti", "#F59E0B", Phase::BackOffice, false),
    ("documenti_verificati", "Documenti Verificati", "#10B981", Phase::BackOffice, false),
    ("trattativa", "Trattativa", "#EC4899", Phase::Negotiation, false),
    ("preventivo_inviato", "Preventivo Inviato", "#14B8A6", Phase::Quote, false),
    ("in_perfezionamento", "In Perfezionamento", "#0EA5E9", Phase::Finalization, false),
    ("contratto_firmato", "Contratto Firmato", "#22C55E", Phase::Closing, true),
    ("venduto", "Venduto", "#16A34A", Phase::Closing, true),
    ("perso", "Perso", "#EF4444", Phase::Closing, true),
];

#[derive(Default)]
struct MemoryState {
    leads: HashMap<Uuid, Lead>,
    statuses: HashMap<String, Status>,
    campaigns: HashMap<Uuid, Campaign>,
    timeline: Vec<TimelineEntry>,
    documents: Vec<Document>,
    requests: HashMap<Uuid, BoRequest>,
    contracts: HashMap<Uuid, Contract>,
    appointments: HashMap<Uuid, Appointment>,
    announcements: Vec<Announcement>,
    users: HashMap<Uuid, User>,
}

/// Gateway em memória: testes e execução local (`STORAGE=memory`).
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    unavailable: Arc<AtomicBool>,
    lead_inserts_fail: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store já com o pipeline padrão.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let statuses = DEFAULT_PIPELINE
            .iter()
            .enumerate()
            .map(|(i, (id, name, color, phase, closes))| Status {
                id: id.to_string(),
                name: name.to_string(),
                color: color.to_string(),
                position: i as i32 + 1,
                active: true,
                phase: *phase,
                closes_lead: *closes,
                allowed_transitions: Vec::new(),
                created_at: now,
            })
            .map(|s| (s.id.clone(), s))
            .collect();
        Self {
            state: Arc::new(RwLock::new(MemoryState { statuses, ..Default::default() })),
            unavailable: Arc::default(),
            lead_inserts_fail: Arc::default(),
        }
    }

    pub async fn add_user(&self, display_name: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            email: format!("{}@example.com", display_name.to_lowercase().replace(' ', ".")),
            role,
            active: true,
            created_at: Utc::now(),
        };
        self.state.write().await.users.insert(user.id, user.clone());
        user
    }

    pub async fn deactivate_user(&self, id: Uuid) {
        if let Some(user) = self.state.write().await.users.get_mut(&id) {
            user.active = false;
        }
    }

    /// Simula queda do banco: toda chamada passa a falhar com `PersistenceUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Só a gravação de novos leads falha; o resto do armazenamento responde.
    pub fn set_lead_inserts_fail(&self, fail: bool) {
        self.lead_inserts_fail.store(fail, Ordering::SeqCst);
    }

    pub fn stores(&self) -> Stores {
        let shared = Arc::new(self.clone());
        Stores {
            leads: shared.clone(),
            statuses: shared.clone(),
            campaigns: shared.clone(),
            timeline: shared.clone(),
            backoffice: shared.clone(),
            contracts: shared.clone(),
            appointments: shared.clone(),
            announcements: shared.clone(),
            users: shared,
        }
    }

    fn check(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(AppError::PersistenceUnavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn insert_lead(&self, lead: &Lead, entry: &TimelineEntry) -> Result<(), AppError> {
        self.check()?;
        if self.lead_inserts_fail.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceUnavailable);
        }
        let mut state = self.state.write().await;
        state.leads.insert(lead.id, lead.clone());
        state.timeline.push(entry.clone());
        Ok(())
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        self.check()?;
        Ok(self.state.read().await.leads.get(&id).cloned())
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        self.check()?;
        let state = self.state.read().await;
        let mut leads: Vec<Lead> = state.leads.values().filter(|l| filter.matches(l)).cloned().collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(leads)
    }

    async fn save_lead(&self, lead: &Lead, entry: Option<&TimelineEntry>) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        let stored = state.leads.get_mut(&lead.id).ok_or(AppError::LeadNotFound)?;
        // status/fase só mudam via apply_status_change
        let (status_id, phase, closed_at) = (stored.status_id.clone(), stored.phase, stored.closed_at);
        *stored = Lead { status_id, phase, closed_at, ..lead.clone() };
        if let Some(entry) = entry {
            state.timeline.push(entry.clone());
        }
        Ok(())
    }

    async fn apply_status_change(
        &self,
        lead_id: Uuid,
        change: &StatusChange,
        entry: &TimelineEntry,
    ) -> Result<Lead, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        let lead = state.leads.get_mut(&lead_id).ok_or(AppError::LeadNotFound)?;
        lead.status_id = change.status_id.clone();
        lead.phase = change.phase;
        lead.updated_at = change.updated_at;
        if change.closed_at.is_some() {
            lead.closed_at = change.closed_at;
        }
        let updated = lead.clone();
        state.timeline.push(entry.clone());
        Ok(updated)
    }

    async fn append_activity(&self, entry: &TimelineEntry) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        let lead = state.leads.get_mut(&entry.lead_id).ok_or(AppError::LeadNotFound)?;
        lead.updated_at = entry.created_at;
        state.timeline.push(entry.clone());
        Ok(())
    }

    async fn delete_cascade(&self, id: Uuid) -> Result<bool, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.leads.remove(&id).is_none() {
            return Ok(false);
        }
        state.timeline.retain(|e| e.lead_id != id);
        state.documents.retain(|d| d.lead_id != id);
        state.requests.retain(|_, r| r.lead_id != id);
        for appointment in state.appointments.values_mut().filter(|a| a.lead_id == Some(id)) {
            appointment.lead_id = None;
        }
        Ok(true)
    }

    async fn add_document(&self, document: &Document, entry: &TimelineEntry) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        let lead = state.leads.get_mut(&document.lead_id).ok_or(AppError::LeadNotFound)?;
        lead.updated_at = entry.created_at;
        state.documents.push(document.clone());
        state.timeline.push(entry.clone());
        Ok(())
    }

    async fn list_documents(&self, lead_id: Uuid) -> Result<Vec<Document>, AppError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.documents.iter().filter(|d| d.lead_id == lead_id).cloned().collect())
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn list_statuses(&self) -> Result<Vec<Status>, AppError> {
        self.check()?;
        let mut statuses: Vec<Status> = self.state.read().await.statuses.values().cloned().collect();
        statuses.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        Ok(statuses)
    }

    async fn get_status(&self, id: &str) -> Result<Option<Status>, AppError> {
        self.check()?;
        Ok(self.state.read().await.statuses.get(id).cloned())
    }

    async fn insert_status(&self, status: &Status) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.statuses.contains_key(&status.id) {
            return Err(AppError::StatusAlreadyExists(status.id.clone()));
        }
        state.statuses.insert(status.id.clone(), status.clone());
        Ok(())
    }

    async fn update_status(&self, status: &Status) -> Result<u64, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        if !state.statuses.contains_key(&status.id) {
            return Err(AppError::StatusNotFound(status.id.clone()));
        }
        state.statuses.insert(status.id.clone(), status.clone());
        let mut affected = 0;
        for lead in state.leads.values_mut().filter(|l| l.status_id == status.id) {
            if lead.phase != status.phase {
                lead.phase = status.phase;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn reorder_statuses(&self, ids: &[String]) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        if let Some(missing) = ids.iter().find(|id| !state.statuses.contains_key(*id)) {
            return Err(AppError::StatusNotFound(missing.clone()));
        }
        for (i, id) in ids.iter().enumerate() {
            if let Some(status) = state.statuses.get_mut(id) {
                status.position = i as i32 + 1;
            }
        }
        Ok(())
    }

    async fn delete_and_reassign(&self, id: &str, fallback: &Status) -> Result<u64, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.statuses.remove(id).is_none() {
            return Err(AppError::StatusNotFound(id.to_string()));
        }
        let mut moved = 0;
        for lead in state.leads.values_mut().filter(|l| l.status_id == id) {
            lead.status_id = fallback.id.clone();
            lead.phase = fallback.phase;
            moved += 1;
        }
        Ok(moved)
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, AppError> {
        self.check()?;
        let mut campaigns: Vec<Campaign> = self.state.read().await.campaigns.values().cloned().collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        self.check()?;
        Ok(self.state.read().await.campaigns.get(&id).cloned())
    }

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), AppError> {
        self.check()?;
        self.state.write().await.campaigns.insert(campaign.id, campaign.clone());
        Ok(())
    }

    async fn update_campaign(&self, campaign: &Campaign) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        let stored = state.campaigns.get_mut(&campaign.id).ok_or(AppError::CampaignNotFound)?;
        let counters = std::mem::take(&mut stored.counters);
        *stored = Campaign { counters, ..campaign.clone() };
        Ok(())
    }

    async fn increment_counter(&self, campaign_id: Uuid, consultant_id: Uuid) -> Result<Campaign, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        let campaign = state.campaigns.get_mut(&campaign_id).ok_or(AppError::CampaignNotFound)?;
        *campaign.counters.entry(consultant_id).or_insert(0) += 1;
        Ok(campaign.clone())
    }
}

#[async_trait]
impl TimelineStore for MemoryStore {
    async fn append(&self, entry: &TimelineEntry) -> Result<(), AppError> {
        self.check()?;
        self.state.write().await.timeline.push(entry.clone());
        Ok(())
    }

    async fn list_for_lead(&self, lead_id: Uuid, range: &TimeRange) -> Result<Vec<TimelineEntry>, AppError> {
        self.check()?;
        let state = self.state.read().await;
        // Vec em ordem de inserção: inverter dá "mais recentes primeiro" com desempate estável
        Ok(state
            .timeline
            .iter()
            .rev()
            .filter(|e| e.lead_id == lead_id && range.contains(e.created_at))
            .cloned()
            .collect())
    }

    async fn list_between(&self, range: &TimeRange) -> Result<Vec<TimelineEntry>, AppError> {
        self.check()?;
        let state = self.state.read().await;
        let mut entries: Vec<TimelineEntry> =
            state.timeline.iter().filter(|e| range.contains(e.created_at)).cloned().collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }
}

#[async_trait]
impl BackOfficeStore for MemoryStore {
    async fn insert_request(&self, request: &BoRequest, entry: &TimelineEntry) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        if !state.leads.contains_key(&request.lead_id) {
            return Err(AppError::LeadNotFound);
        }
        state.requests.insert(request.id, request.clone());
        state.timeline.push(entry.clone());
        Ok(())
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<BoRequest>, AppError> {
        self.check()?;
        Ok(self.state.read().await.requests.get(&id).cloned())
    }

    async fn list_for_lead(&self, lead_id: Uuid) -> Result<Vec<BoRequest>, AppError> {
        self.check()?;
        let state = self.state.read().await;
        let mut requests: Vec<BoRequest> =
            state.requests.values().filter(|r| r.lead_id == lead_id).cloned().collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    async fn list_open(&self) -> Result<Vec<BoRequest>, AppError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .requests
            .values()
            .filter(|r| r.state != BoRequestState::Completed)
            .cloned()
            .collect())
    }

    async fn claim_if_waiting(
        &self,
        id: Uuid,
        handler_id: Uuid,
        handler_name: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<BoRequest>, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        match state.requests.get_mut(&id) {
            Some(request) if request.state == BoRequestState::Waiting => {
                request.state = BoRequestState::InProgress;
                request.handler_id = Some(handler_id);
                request.handler_name = Some(handler_name.to_string());
                request.claimed_at = Some(at);
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn complete(
        &self,
        id: Uuid,
        response: &str,
        at: DateTime<Utc>,
        entry: &TimelineEntry,
    ) -> Result<Option<BoRequest>, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        let completed = match state.requests.get_mut(&id) {
            Some(request) if request.state == BoRequestState::InProgress => {
                request.state = BoRequestState::Completed;
                request.response = Some(response.to_string());
                request.responded_at = Some(at);
                request.read_by_consultant = false;
                request.clone()
            }
            _ => return Ok(None),
        };
        if let Some(lead) = state.leads.get_mut(&completed.lead_id) {
            lead.updated_at = at;
        }
        state.timeline.push(entry.clone());
        Ok(Some(completed))
    }

    async fn mark_read(&self, id: Uuid) -> Result<Option<BoRequest>, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        Ok(state.requests.get_mut(&id).map(|r| {
            r.read_by_consultant = true;
            r.clone()
        }))
    }

    async fn count_unread(&self, requester_id: Uuid) -> Result<u64, AppError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .requests
            .values()
            .filter(|r| {
                r.requester_id == requester_id && r.state == BoRequestState::Completed && !r.read_by_consultant
            })
            .count() as u64)
    }
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn find_by_lead(&self, lead_id: Uuid) -> Result<Option<Contract>, AppError> {
        self.check()?;
        Ok(self.state.read().await.contracts.get(&lead_id).cloned())
    }

    async fn insert_contract(&self, contract: &Contract) -> Result<(), AppError> {
        self.check()?;
        self.state.write().await.contracts.insert(contract.lead_id, contract.clone());
        Ok(())
    }

    async fn update_contract(&self, contract: &Contract) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        match state.contracts.get_mut(&contract.lead_id) {
            Some(stored) => {
                *stored = contract.clone();
                Ok(())
            }
            None => Err(AppError::ContractNotFound),
        }
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn insert_appointment(&self, appointment: &Appointment, entry: Option<&TimelineEntry>) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        if let Some(entry) = entry {
            let lead = state.leads.get_mut(&entry.lead_id).ok_or(AppError::LeadNotFound)?;
            lead.updated_at = entry.created_at;
            state.timeline.push(entry.clone());
        }
        state.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        self.check()?;
        Ok(self.state.read().await.appointments.get(&id).cloned())
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppError> {
        self.check()?;
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> =
            state.appointments.values().filter(|a| filter.matches(a)).cloned().collect();
        appointments.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.created_at.cmp(&b.created_at)));
        Ok(appointments)
    }

    async fn update_appointment(&self, appointment: &Appointment, entry: Option<&TimelineEntry>) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        if !state.appointments.contains_key(&appointment.id) {
            return Err(AppError::AppointmentNotFound);
        }
        if let Some(entry) = entry {
            let lead = state.leads.get_mut(&entry.lead_id).ok_or(AppError::LeadNotFound)?;
            lead.updated_at = entry.created_at;
            state.timeline.push(entry.clone());
        }
        state.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn delete_appointment(&self, id: Uuid, entry: Option<&TimelineEntry>) -> Result<bool, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.appointments.remove(&id).is_none() {
            return Ok(false);
        }
        if let Some(entry) = entry {
            if let Some(lead) = state.leads.get_mut(&entry.lead_id) {
                lead.updated_at = entry.created_at;
                state.timeline.push(entry.clone());
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn insert_announcement(&self, announcement: &Announcement) -> Result<(), AppError> {
        self.check()?;
        self.state.write().await.announcements.push(announcement.clone());
        Ok(())
    }

    async fn list_announcements(&self) -> Result<Vec<Announcement>, AppError> {
        self.check()?;
        let mut announcements = self.state.read().await.announcements.clone();
        announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(announcements)
    }

    async fn mark_announcement_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Announcement>, AppError> {
        self.check()?;
        let mut state = self.state.write().await;
        Ok(state.announcements.iter_mut().find(|a| a.id == id).map(|a| {
            if !a.read_by.contains(&user_id) {
                a.read_by.push(user_id);
            }
            a.clone()
        }))
    }

    async fn count_unread_announcements(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.announcements.iter().filter(|a| !a.is_read_by(user_id)).count() as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.check()?;
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn list_active_consultants(&self) -> Result<Vec<User>, AppError> {
        self.check()?;
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.active && u.role == Role::Consultant)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(users)
    }
}
