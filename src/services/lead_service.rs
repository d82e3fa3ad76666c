// src/services/lead_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, retry::ReadRetry},
    db::store::{LeadStore, UserStore},
    models::{
        auth::{Actor, Role, User},
        lead::{
            BulkDeleteFailure, BulkDeleteReport, Document, ImportFailure, ImportReport, IngestOutcome, Lead,
            LeadFilter, LeadQuery, LeadUpdate, NewDocument, NewLead,
        },
        pipeline::{Phase, Status},
        timeline::{TimeRange, TimelineEntry},
    },
    services::{
        campaign_service::CampaignService,
        pipeline_service::{PipelineService, TransitionOptions},
        timeline_service::TimelineService,
    },
};

/// Quem pode ver e mexer em um lead: admin em todos, consultor nos seus,
/// back-office nos que estão em fase de back-office.
pub fn can_access(actor: &Actor, lead: &Lead) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Consultant => lead.consultant_id == Some(actor.id),
        Role::BackOffice => lead.phase.is_back_office(),
    }
}

#[derive(Clone)]
pub struct LeadService {
    leads: Arc<dyn LeadStore>,
    users: Arc<dyn UserStore>,
    pipeline: PipelineService,
    campaigns: CampaignService,
    timeline: TimelineService,
    retry: ReadRetry,
}

impl LeadService {
    pub fn new(
        leads: Arc<dyn LeadStore>,
        users: Arc<dyn UserStore>,
        pipeline: PipelineService,
        campaigns: CampaignService,
        timeline: TimelineService,
        retry: ReadRetry,
    ) -> Self {
        Self { leads, users, pipeline, campaigns, timeline, retry }
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    /// Criação manual. O admin pode escolher o consultor, o consultor fica com
    /// o lead e o back-office cria sem dono.
    pub async fn create(&self, payload: NewLead, actor: &Actor) -> Result<Lead, AppError> {
        let consultant_id = match actor.role {
            Role::Admin => match payload.consultant_id {
                Some(id) => Some(self.active_consultant(id).await?.id),
                None => None,
            },
            Role::Consultant => Some(actor.id),
            Role::BackOffice => None,
        };
        let initial = self.pipeline.default_status().await?;
        self.insert_new(payload, consultant_id, initial, actor, "Lead creato".to_string()).await
    }

    /// Ponto de entrada dos adaptadores (webhook, planilha). Sem consultor
    /// disponível o lead é gravado assim mesmo, sem dono, e o motivo volta.
    ///
    /// Tudo o que pode falhar é lido antes do incremento do contador: depois
    /// dele a única escrita é a do lead. Se essa falhar, o contador fica uma
    /// unidade à frente (o incremento não é desfeito).
    pub async fn ingest(&self, payload: NewLead, actor: &Actor) -> Result<IngestOutcome, AppError> {
        let Some(campaign_id) = payload.campaign_id else {
            return Err(AppError::invalid_field("campaignId", "Campanha obrigatória"));
        };
        let campaign = self.campaigns.get(campaign_id).await?;
        let initial = self.pipeline.default_status().await?;

        let (consultant_id, unassigned_reason) = match self.campaigns.assign(campaign_id).await {
            Ok(id) => (Some(id), None),
            Err(AppError::NoAvailableConsultant) => (None, Some(AppError::NoAvailableConsultant.to_string())),
            Err(e) => return Err(e),
        };

        let payload = NewLead {
            source: payload.source.or_else(|| Some(campaign.source.clone())),
            ..payload
        };
        let note = format!("Lead creato dalla campagna {}", campaign.name);
        let lead = self.insert_new(payload, consultant_id, initial, actor, note).await?;
        Ok(IngestOutcome { lead, unassigned_reason })
    }

    /// Importação em lote, linha a linha. Uma linha ruim não interrompe as outras.
    pub async fn import(&self, campaign_id: Uuid, rows: Vec<NewLead>, actor: &Actor) -> Result<ImportReport, AppError> {
        // campanha inexistente ou desativada invalida o lote inteiro
        let campaign = self.campaigns.get(campaign_id).await?;
        if !campaign.active {
            return Err(AppError::CampaignInactive);
        }

        let mut report = ImportReport::default();
        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            if let Err(e) = row.validate() {
                report.failed.push(ImportFailure { row: row_number, reason: e.to_string() });
                continue;
            }
            let row = NewLead { campaign_id: Some(campaign_id), ..row };
            match self.ingest(row, actor).await {
                Ok(outcome) => {
                    report.imported += 1;
                    if outcome.unassigned_reason.is_some() {
                        report.unassigned += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("Linha {} da importação falhou: {}", row_number, e);
                    report.failed.push(ImportFailure { row: row_number, reason: e.to_string() });
                }
            }
        }

        tracing::info!(
            "Importação na campanha '{}': {} importados, {} sem consultor, {} falhas",
            campaign.name,
            report.imported,
            report.unassigned,
            report.failed.len()
        );
        Ok(report)
    }

    async fn insert_new(
        &self,
        payload: NewLead,
        consultant_id: Option<Uuid>,
        initial: Status,
        actor: &Actor,
        note: String,
    ) -> Result<Lead, AppError> {
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            email: payload.email,
            phone: payload.phone,
            source: payload.source,
            campaign_id: payload.campaign_id,
            client_type: payload.client_type.unwrap_or_default(),
            consultant_id,
            status_id: initial.id.clone(),
            phase: initial.phase,
            priority: payload.priority.unwrap_or_default(),
            requested_vehicle: payload.requested_vehicle,
            needs: payload.needs,
            notes: payload.notes,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        let entry = TimelineEntry::status_change(lead.id, actor, None, &initial.id, note).at(now);

        self.leads.insert_lead(&lead, &entry).await?;
        tracing::info!(
            "Lead {} ({}) criado por {}{}",
            lead.id,
            lead.full_name(),
            actor.display_name,
            consultant_id.map(|c| format!(", atribuído a {c}")).unwrap_or_default()
        );
        Ok(lead)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn get(&self, id: Uuid, actor: &Actor) -> Result<Lead, AppError> {
        let lead = self
            .retry
            .run("lead", || self.leads.get_lead(id))
            .await?
            .ok_or(AppError::LeadNotFound)?;
        if !can_access(actor, &lead) {
            return Err(AppError::Forbidden);
        }
        Ok(lead)
    }

    /// Lista com o escopo do perfil já aplicado.
    pub async fn list(&self, query: &LeadQuery, actor: &Actor) -> Result<Vec<Lead>, AppError> {
        let mut filter = LeadFilter {
            consultant_id: None,
            phases: query.phase.map(|p| vec![p]),
            status_id: query.status.clone(),
            created_since: query.period.unwrap_or_default().since(Utc::now()),
        };

        match actor.role {
            Role::Admin => filter.consultant_id = query.consultant_id,
            Role::Consultant => filter.consultant_id = Some(actor.id),
            Role::BackOffice => {
                filter.consultant_id = query.consultant_id;
                filter.phases = match query.phase {
                    Some(p) if p.is_back_office() => Some(vec![p]),
                    Some(_) => return Ok(Vec::new()),
                    None => Some(Phase::back_office_phases()),
                };
            }
        }

        self.retry.run("leads", || self.leads.list_leads(&filter)).await
    }

    pub async fn list_documents(&self, id: Uuid, actor: &Actor) -> Result<Vec<Document>, AppError> {
        self.get(id, actor).await?;
        self.retry.run("documentos", || self.leads.list_documents(id)).await
    }

    pub async fn timeline(&self, id: Uuid, range: &TimeRange, actor: &Actor) -> Result<Vec<TimelineEntry>, AppError> {
        self.get(id, actor).await?;
        self.timeline.list(id, range).await
    }

    // =========================================================================
    //  ALTERAÇÕES
    // =========================================================================

    pub async fn update_details(&self, id: Uuid, payload: LeadUpdate, actor: &Actor) -> Result<Lead, AppError> {
        let mut lead = self.get(id, actor).await?;
        payload.apply_to(&mut lead);
        lead.updated_at = Utc::now();
        self.leads.save_lead(&lead, None).await?;
        Ok(lead)
    }

    /// Só o admin troca o dono. Fica registrado como nota na timeline.
    pub async fn reassign(&self, id: Uuid, consultant_id: Uuid, actor: &Actor) -> Result<Lead, AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        let mut lead = self.get(id, actor).await?;
        let consultant = self.active_consultant(consultant_id).await?;

        let now = Utc::now();
        lead.consultant_id = Some(consultant.id);
        lead.updated_at = now;
        let entry = TimelineEntry::note(lead.id, actor, format!("Riassegnato a {}", consultant.display_name)).at(now);

        self.leads.save_lead(&lead, Some(&entry)).await?;
        tracing::info!("Lead {} reatribuído a {}", lead.id, consultant.display_name);
        Ok(lead)
    }

    pub async fn add_note(&self, id: Uuid, text: &str, actor: &Actor) -> Result<TimelineEntry, AppError> {
        let lead = self.get(id, actor).await?;
        let entry = TimelineEntry::note(lead.id, actor, text.trim());
        self.leads.append_activity(&entry).await?;
        Ok(entry)
    }

    pub async fn log_call(&self, id: Uuid, text: &str, actor: &Actor) -> Result<TimelineEntry, AppError> {
        let lead = self.get(id, actor).await?;
        let entry = TimelineEntry::call(lead.id, actor, text.trim());
        self.leads.append_activity(&entry).await?;
        Ok(entry)
    }

    /// Só metadados: o arquivo já foi enviado ao storage externo.
    pub async fn attach_document(&self, id: Uuid, payload: NewDocument, actor: &Actor) -> Result<Document, AppError> {
        let lead = self.get(id, actor).await?;
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            lead_id: lead.id,
            name: payload.name.trim().to_string(),
            url: payload.url,
            kind: payload.kind,
            uploaded_by: actor.id,
            uploaded_by_name: actor.display_name.clone(),
            uploaded_at: now,
        };
        let entry = TimelineEntry::document(lead.id, actor, format!("Documento caricato: {}", document.name)).at(now);
        self.leads.add_document(&document, &entry).await?;
        Ok(document)
    }

    pub async fn change_status(
        &self,
        id: Uuid,
        to: &str,
        options: TransitionOptions,
        actor: &Actor,
    ) -> Result<Lead, AppError> {
        let lead = self.get(id, actor).await?;
        self.pipeline.transition(&lead, to, actor, options).await
    }

    // =========================================================================
    //  REMOÇÃO
    // =========================================================================

    /// Remove o lead com timeline, documentos e pedidos de back-office.
    pub async fn delete(&self, id: Uuid, actor: &Actor) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        if !self.leads.delete_cascade(id).await? {
            return Err(AppError::LeadNotFound);
        }
        tracing::info!("Lead {} removido por {}", id, actor.display_name);
        Ok(())
    }

    /// Um por vez, em sequência. Falhas são coletadas e não desfazem o que já saiu.
    pub async fn bulk_delete(&self, ids: &[Uuid], actor: &Actor) -> Result<BulkDeleteReport, AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }

        let mut report = BulkDeleteReport::default();
        for id in ids {
            match self.delete(*id, actor).await {
                Ok(()) => report.deleted.push(*id),
                Err(e) => {
                    tracing::warn!("Falha ao remover o lead {}: {}", id, e);
                    report.failed.push(BulkDeleteFailure { id: *id, reason: e.to_string() });
                }
            }
        }

        tracing::info!(
            "Remoção em lote: {} removidos, {} falharam",
            report.deleted.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn active_consultant(&self, id: Uuid) -> Result<User, AppError> {
        let user = self
            .retry
            .run("usuário", || self.users.get_user(id))
            .await?
            .ok_or(AppError::UserNotFound)?;
        if !user.active || user.role != Role::Consultant {
            return Err(AppError::invalid_field("consultantId", "O usuário não é um consultor ativo"));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::{campaign::DistributionPayload, lead::DocumentKind, timeline::TimelineKind},
    };
    use std::collections::BTreeSet;
    use std::time::Duration;

    struct Fixture {
        store: MemoryStore,
        service: LeadService,
        campaigns: CampaignService,
        admin: Actor,
        consultant: Actor,
        back_office: Actor,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::seeded();
        let stores = store.stores();
        let retry = ReadRetry::new(Duration::from_millis(1));
        let pipeline = PipelineService::new(stores.statuses.clone(), stores.leads.clone(), retry, "nuovo");
        let campaigns = CampaignService::new(stores.campaigns.clone(), stores.users.clone(), retry);
        let timeline = TimelineService::new(stores.timeline.clone(), retry);
        let service = LeadService::new(
            stores.leads.clone(),
            stores.users.clone(),
            pipeline,
            campaigns.clone(),
            timeline,
            retry,
        );
        let admin = store.add_user("Admin", Role::Admin).await.as_actor();
        let consultant = store.add_user("Anna Verdi", Role::Consultant).await.as_actor();
        let back_office = store.add_user("Giulia Neri", Role::BackOffice).await.as_actor();
        Fixture { store, service, campaigns, admin, consultant, back_office }
    }

    fn new_lead(name: &str) -> NewLead {
        NewLead { first_name: name.into(), last_name: "Bianchi".into(), ..Default::default() }
    }

    #[tokio::test]
    async fn consultant_creates_own_lead_at_default_status() {
        let f = fixture().await;
        let lead = f.service.create(new_lead("Luca"), &f.consultant).await.unwrap();
        assert_eq!(lead.consultant_id, Some(f.consultant.id));
        assert_eq!(lead.status_id, "nuovo");
        assert_eq!(lead.phase, Phase::Contact);

        let timeline = f.service.timeline(lead.id, &TimeRange::default(), &f.consultant).await.unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].kind, TimelineKind::StatusChange);
        assert_eq!(timeline[0].old_status, None);
        assert_eq!(timeline[0].new_status.as_deref(), Some("nuovo"));
    }

    #[tokio::test]
    async fn back_office_creates_unassigned_lead() {
        let f = fixture().await;
        let payload = NewLead { consultant_id: Some(f.consultant.id), ..new_lead("Luca") };
        let lead = f.service.create(payload, &f.back_office).await.unwrap();
        assert_eq!(lead.consultant_id, None);
    }

    #[tokio::test]
    async fn consultant_cannot_see_other_leads() {
        let f = fixture().await;
        let other = f.store.add_user("Bruno Neri", Role::Consultant).await.as_actor();
        let lead = f.service.create(new_lead("Luca"), &other).await.unwrap();

        assert!(matches!(f.service.get(lead.id, &f.consultant).await, Err(AppError::Forbidden)));
        let visible = f.service.list(&LeadQuery::default(), &f.consultant).await.unwrap();
        assert!(visible.is_empty());
        assert_eq!(f.service.list(&LeadQuery::default(), &f.admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn back_office_sees_only_back_office_phases() {
        let f = fixture().await;
        let a = f.service.create(new_lead("Luca"), &f.consultant).await.unwrap();
        let b = f.service.create(new_lead("Sara"), &f.consultant).await.unwrap();
        f.service
            .change_status(b.id, "in_attesa_documenti", TransitionOptions::default(), &f.consultant)
            .await
            .unwrap();

        let visible = f.service.list(&LeadQuery::default(), &f.back_office).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, b.id);
        assert!(matches!(f.service.get(a.id, &f.back_office).await, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn ingest_without_consultants_leaves_lead_unassigned() {
        let f = fixture().await;
        let campaign = f
            .campaigns
            .create(crate::models::campaign::NewCampaign { name: "Promo".into(), source: "google".into() })
            .await
            .unwrap();
        f.campaigns
            .save_distribution(
                campaign.id,
                DistributionPayload {
                    distribution: [(f.consultant.id, 100)].into_iter().collect(),
                    excluded: BTreeSet::new(),
                },
            )
            .await
            .unwrap();

        let payload = NewLead { campaign_id: Some(campaign.id), ..new_lead("Luca") };
        let assigned = f.service.ingest(payload.clone(), &f.admin).await.unwrap();
        assert_eq!(assigned.lead.consultant_id, Some(f.consultant.id));
        assert_eq!(assigned.lead.source.as_deref(), Some("google"));
        assert!(assigned.unassigned_reason.is_none());

        f.store.deactivate_user(f.consultant.id).await;
        let unassigned = f.service.ingest(payload, &f.admin).await.unwrap();
        assert_eq!(unassigned.lead.consultant_id, None);
        assert!(unassigned.unassigned_reason.is_some());
    }

    async fn single_consultant_campaign(f: &Fixture) -> Uuid {
        let campaign = f
            .campaigns
            .create(crate::models::campaign::NewCampaign { name: "Promo".into(), source: "google".into() })
            .await
            .unwrap();
        f.campaigns
            .save_distribution(
                campaign.id,
                DistributionPayload {
                    distribution: [(f.consultant.id, 100)].into_iter().collect(),
                    excluded: BTreeSet::new(),
                },
            )
            .await
            .unwrap();
        campaign.id
    }

    #[tokio::test]
    async fn missing_default_status_fails_before_counting() {
        use crate::db::store::StatusStore;

        let f = fixture().await;
        let campaign_id = single_consultant_campaign(&f).await;
        let fallback = f.store.get_status("contattato").await.unwrap().unwrap();
        f.store.delete_and_reassign("nuovo", &fallback).await.unwrap();

        let payload = NewLead { campaign_id: Some(campaign_id), ..new_lead("Luca") };
        let err = f.service.ingest(payload, &f.admin).await.unwrap_err();
        assert!(matches!(err, AppError::StatusNotFound(ref id) if id == "nuovo"));
        assert_eq!(f.campaigns.get(campaign_id).await.unwrap().counter(&f.consultant.id), 0);
    }

    #[tokio::test]
    async fn failed_insert_after_assignment_leaves_counter_ahead() {
        let f = fixture().await;
        let campaign_id = single_consultant_campaign(&f).await;

        f.store.set_lead_inserts_fail(true);
        let payload = NewLead { campaign_id: Some(campaign_id), ..new_lead("Luca") };
        let err = f.service.ingest(payload.clone(), &f.admin).await.unwrap_err();
        assert!(matches!(err, AppError::PersistenceUnavailable));
        assert!(f.service.list(&LeadQuery::default(), &f.admin).await.unwrap().is_empty());
        // o incremento não é desfeito
        assert_eq!(f.campaigns.get(campaign_id).await.unwrap().counter(&f.consultant.id), 1);

        f.store.set_lead_inserts_fail(false);
        f.service.ingest(payload, &f.admin).await.unwrap();
        assert_eq!(f.campaigns.get(campaign_id).await.unwrap().counter(&f.consultant.id), 2);
    }

    #[tokio::test]
    async fn import_reports_bad_rows_and_keeps_going() {
        let f = fixture().await;
        let campaign = f
            .campaigns
            .create(crate::models::campaign::NewCampaign { name: "Fiera".into(), source: "evento".into() })
            .await
            .unwrap();
        f.campaigns
            .save_distribution(
                campaign.id,
                DistributionPayload {
                    distribution: [(f.consultant.id, 100)].into_iter().collect(),
                    excluded: BTreeSet::new(),
                },
            )
            .await
            .unwrap();

        let rows = vec![
            new_lead("Luca"),
            NewLead { email: Some("non-valida".into()), ..new_lead("Sara") },
            new_lead("Paolo"),
        ];
        let report = f.service.import(campaign.id, rows, &f.admin).await.unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.unassigned, 0);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].row, 2);
    }

    #[tokio::test]
    async fn bulk_delete_tolerates_missing_ids() {
        let f = fixture().await;
        let a = f.service.create(new_lead("Luca"), &f.consultant).await.unwrap();
        let b = f.service.create(new_lead("Sara"), &f.consultant).await.unwrap();
        let ghost = Uuid::new_v4();

        let report = f.service.bulk_delete(&[a.id, ghost, b.id], &f.admin).await.unwrap();
        assert_eq!(report.deleted, vec![a.id, b.id]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, ghost);
        assert!(f.service.list(&LeadQuery::default(), &f.admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_admin_deletes() {
        let f = fixture().await;
        let lead = f.service.create(new_lead("Luca"), &f.consultant).await.unwrap();
        assert!(matches!(f.service.delete(lead.id, &f.consultant).await, Err(AppError::Forbidden)));
        assert!(matches!(f.service.bulk_delete(&[lead.id], &f.consultant).await, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn reassign_logs_a_note() {
        let f = fixture().await;
        let other = f.store.add_user("Bruno Neri", Role::Consultant).await;
        let lead = f.service.create(new_lead("Luca"), &f.consultant).await.unwrap();

        let moved = f.service.reassign(lead.id, other.id, &f.admin).await.unwrap();
        assert_eq!(moved.consultant_id, Some(other.id));
        let timeline = f.service.timeline(lead.id, &TimeRange::default(), &f.admin).await.unwrap();
        assert_eq!(timeline[0].kind, TimelineKind::Note);
        assert!(timeline[0].note.contains("Bruno Neri"));

        assert!(matches!(
            f.service.reassign(lead.id, f.back_office.id, &f.admin).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn activity_touches_last_modified() {
        let f = fixture().await;
        let lead = f.service.create(new_lead("Luca"), &f.consultant).await.unwrap();
        let call = f.service.log_call(lead.id, " Non risponde ", &f.consultant).await.unwrap();
        assert_eq!(call.note, "Non risponde");
        f.service
            .attach_document(
                lead.id,
                NewDocument {
                    name: "patente.pdf".into(),
                    url: "https://files.example.com/patente.pdf".into(),
                    kind: DocumentKind::IdentityDocument,
                },
                &f.consultant,
            )
            .await
            .unwrap();

        let stored = f.service.get(lead.id, &f.consultant).await.unwrap();
        assert!(stored.updated_at >= call.created_at);
        assert_eq!(f.service.list_documents(lead.id, &f.consultant).await.unwrap().len(), 1);
        let kinds: Vec<TimelineKind> = f
            .service
            .timeline(lead.id, &TimeRange::default(), &f.consultant)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![TimelineKind::Document, TimelineKind::Call, TimelineKind::StatusChange]);
    }
}
