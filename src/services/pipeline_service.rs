// src/services/pipeline_service.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    common::{error::AppError, retry::ReadRetry},
    db::store::{LeadStore, StatusStore},
    models::{
        auth::Actor,
        lead::{Lead, StatusChange},
        pipeline::{NewStatus, Status, StatusUpdate, TransitionCheck},
        timeline::TimelineEntry,
    },
};

/// Opções de uma transição. `force` confirma uma transição não recomendada.
#[derive(Debug, Clone, Default)]
pub struct TransitionOptions {
    pub force: bool,
    pub note: Option<String>,
}

impl TransitionOptions {
    pub fn forced() -> Self {
        Self { force: true, note: None }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Clone)]
pub struct PipelineService {
    statuses: Arc<dyn StatusStore>,
    leads: Arc<dyn LeadStore>,
    retry: ReadRetry,
    default_status_id: String,
    sold_status_id: Option<String>,
}

impl PipelineService {
    pub fn new(
        statuses: Arc<dyn StatusStore>,
        leads: Arc<dyn LeadStore>,
        retry: ReadRetry,
        default_status_id: impl Into<String>,
    ) -> Self {
        Self { statuses, leads, retry, default_status_id: default_status_id.into(), sold_status_id: None }
    }

    /// Status de destino dos contratos: não pode sumir nem ser desativado.
    pub fn with_sold_status(mut self, id: impl Into<String>) -> Self {
        self.sold_status_id = Some(id.into());
        self
    }

    pub fn default_status_id(&self) -> &str {
        &self.default_status_id
    }

    fn ensure_unlocked(&self, id: &str) -> Result<(), AppError> {
        if id == self.default_status_id {
            return Err(AppError::DefaultStatusLocked(id.to_string()));
        }
        if self.sold_status_id.as_deref() == Some(id) {
            return Err(AppError::SoldStatusLocked(id.to_string()));
        }
        Ok(())
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_statuses(&self) -> Result<Vec<Status>, AppError> {
        self.retry.run("status", || self.statuses.list_statuses()).await
    }

    /// Colunas do pipeline: só os ativos, por posição.
    pub async fn active_statuses(&self) -> Result<Vec<Status>, AppError> {
        let mut statuses = self.list_statuses().await?;
        statuses.retain(|s| s.active);
        Ok(statuses)
    }

    pub async fn get_status(&self, id: &str) -> Result<Status, AppError> {
        self.retry
            .run("status", || self.statuses.get_status(id))
            .await?
            .ok_or_else(|| AppError::StatusNotFound(id.to_string()))
    }

    pub async fn default_status(&self) -> Result<Status, AppError> {
        self.get_status(&self.default_status_id).await
    }

    pub async fn check_transition(&self, from: &str, to: &str) -> Result<TransitionCheck, AppError> {
        let from = self.get_status(from).await?;
        let to = self.get_status(to).await?;
        Ok(from.check_transition(&to))
    }

    // =========================================================================
    //  TRANSIÇÃO
    // =========================================================================

    /// Move o lead para `to`. A fase vem sempre do status de destino e cada
    /// transição grava exatamente uma entrada `StatusChange` junto com o lead.
    pub async fn transition(
        &self,
        lead: &Lead,
        to: &str,
        actor: &Actor,
        options: TransitionOptions,
    ) -> Result<Lead, AppError> {
        let target = self.get_status(to).await?;
        if !target.active {
            return Err(AppError::StatusInactive(target.id));
        }
        if lead.status_id == target.id {
            return Err(AppError::TransitionNoop(target.id));
        }

        // Status de origem removido não impede sair dele: só não há conselho a dar.
        let origin = self.retry.run("status", || self.statuses.get_status(&lead.status_id)).await?;
        if let Some(origin) = origin {
            if let TransitionCheck::NotRecommended { recommended } = origin.check_transition(&target) {
                if !options.force {
                    tracing::warn!(
                        "Transição {} -> {} não recomendada para o lead {}",
                        origin.id,
                        target.id,
                        lead.id
                    );
                    return Err(AppError::TransitionRejectedAdvisory {
                        from: origin.id,
                        to: target.id,
                        recommended,
                    });
                }
            }
        }

        let now = Utc::now();
        let change = StatusChange {
            status_id: target.id.clone(),
            phase: target.phase,
            updated_at: now,
            closed_at: target.closes_lead.then_some(now),
        };
        let entry = TimelineEntry::status_change(
            lead.id,
            actor,
            Some(&lead.status_id),
            &target.id,
            options.note.unwrap_or_default(),
        )
        .at(now);

        let updated = self.leads.apply_status_change(lead.id, &change, &entry).await?;
        tracing::info!(
            "Lead {} movido de '{}' para '{}' por {}",
            lead.id,
            lead.status_id,
            target.id,
            actor.display_name
        );
        Ok(updated)
    }

    // =========================================================================
    //  ADMINISTRAÇÃO DOS STATUS
    // =========================================================================

    pub async fn create_status(&self, payload: NewStatus) -> Result<Status, AppError> {
        let id = Status::slug(&payload.name);
        if id.is_empty() {
            return Err(AppError::invalid_field("name", "O nome precisa ter letras ou números"));
        }

        let existing = self.list_statuses().await?;
        if existing.iter().any(|s| s.id == id) {
            return Err(AppError::StatusAlreadyExists(id));
        }
        let position = existing.iter().map(|s| s.position).max().unwrap_or(0) + 1;

        let status = Status {
            id,
            name: payload.name.trim().to_string(),
            color: payload.color,
            position,
            active: true,
            phase: payload.phase,
            closes_lead: payload.closes_lead,
            allowed_transitions: Vec::new(),
            created_at: Utc::now(),
        };
        self.statuses.insert_status(&status).await?;
        tracing::info!("Status '{}' criado na posição {}", status.id, status.position);
        Ok(status)
    }

    /// Edita o status. Mudança de fase é propagada aos leads que estão nele.
    pub async fn update_status(&self, id: &str, payload: StatusUpdate) -> Result<Status, AppError> {
        let mut status = self.get_status(id).await?;

        if let Some(name) = payload.name {
            status.name = name.trim().to_string();
        }
        if let Some(color) = payload.color {
            status.color = color;
        }
        if let Some(phase) = payload.phase {
            status.phase = phase;
        }
        if let Some(closes_lead) = payload.closes_lead {
            status.closes_lead = closes_lead;
        }
        if let Some(allowed) = payload.allowed_transitions {
            let known = self.list_statuses().await?;
            if let Some(unknown) = allowed.iter().find(|a| !known.iter().any(|s| &s.id == *a)) {
                return Err(AppError::StatusNotFound(unknown.clone()));
            }
            let mut hints: Vec<String> = Vec::with_capacity(allowed.len());
            for target in allowed {
                if target != status.id && !hints.contains(&target) {
                    hints.push(target);
                }
            }
            status.allowed_transitions = hints;
        }

        let affected = self.statuses.update_status(&status).await?;
        if affected > 0 {
            tracing::info!("Fase do status '{}' propagada para {} leads", status.id, affected);
        }
        Ok(status)
    }

    pub async fn set_active(&self, id: &str, active: bool) -> Result<Status, AppError> {
        if !active {
            self.ensure_unlocked(id)?;
        }
        let mut status = self.get_status(id).await?;
        status.active = active;
        self.statuses.update_status(&status).await?;
        tracing::info!("Status '{}' {}", status.id, if active { "ativado" } else { "desativado" });
        Ok(status)
    }

    /// Renumera as posições na ordem recebida. Ids omitidos vão para o fim,
    /// mantendo a ordem relativa atual.
    pub async fn reorder(&self, ids: Vec<String>) -> Result<Vec<Status>, AppError> {
        let current = self.list_statuses().await?;
        if let Some(unknown) = ids.iter().find(|id| !current.iter().any(|s| &s.id == *id)) {
            return Err(AppError::StatusNotFound(unknown.clone()));
        }

        let mut order: Vec<String> = Vec::with_capacity(current.len());
        for id in ids.into_iter().chain(current.iter().map(|s| s.id.clone())) {
            if !order.contains(&id) {
                order.push(id);
            }
        }

        self.statuses.reorder_statuses(&order).await?;
        self.list_statuses().await
    }

    /// Remove o status movendo os leads dele para o status padrão, em lote e
    /// sem entrada na timeline de cada lead.
    pub async fn delete_status(&self, id: &str) -> Result<u64, AppError> {
        self.ensure_unlocked(id)?;
        self.get_status(id).await?;
        let fallback = self.default_status().await?;

        let moved = self.statuses.delete_and_reassign(id, &fallback).await?;

        // Ninguém mais recomenda um status que não existe
        for mut status in self.list_statuses().await? {
            if status.allowed_transitions.iter().any(|a| a == id) {
                status.allowed_transitions.retain(|a| a != id);
                self.statuses.update_status(&status).await?;
            }
        }

        tracing::info!("Status '{}' removido; {} leads movidos para '{}'", id, moved, fallback.id);
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{store::Stores, MemoryStore},
        models::{auth::Role, lead::LeadFilter, pipeline::Phase, timeline::{TimeRange, TimelineKind}},
    };
    use std::time::Duration;
    use uuid::Uuid;

    struct Fixture {
        stores: Stores,
        service: PipelineService,
        actor: Actor,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::seeded();
        let stores = store.stores();
        let service = PipelineService::new(
            stores.statuses.clone(),
            stores.leads.clone(),
            ReadRetry::new(Duration::from_millis(1)),
            "nuovo",
        );
        let actor = Actor::new(Uuid::new_v4(), "Marco Rossi", Role::Consultant);
        Fixture { stores, service, actor }
    }

    async fn lead_in(f: &Fixture, status_id: &str) -> Lead {
        let status = f.service.get_status(status_id).await.unwrap();
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            first_name: "Luca".into(),
            last_name: "Bianchi".into(),
            email: None,
            phone: None,
            source: None,
            campaign_id: None,
            client_type: Default::default(),
            consultant_id: Some(f.actor.id),
            status_id: status.id.clone(),
            phase: status.phase,
            priority: Default::default(),
            requested_vehicle: None,
            needs: None,
            notes: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        let entry = TimelineEntry::status_change(lead.id, &f.actor, None, &status.id, "");
        f.stores.leads.insert_lead(&lead, &entry).await.unwrap();
        lead
    }

    async fn status_changes(f: &Fixture, lead_id: Uuid) -> Vec<TimelineEntry> {
        f.stores
            .timeline
            .list_for_lead(lead_id, &TimeRange::default())
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == TimelineKind::StatusChange)
            .collect()
    }

    #[tokio::test]
    async fn nuovo_to_venduto_closes_the_lead() {
        let f = fixture();
        let lead = lead_in(&f, "nuovo").await;

        let updated = f.service.transition(&lead, "venduto", &f.actor, TransitionOptions::default()).await.unwrap();
        assert_eq!(updated.status_id, "venduto");
        assert_eq!(updated.phase, Phase::Closing);
        assert!(updated.closed_at.is_some());

        let entries = status_changes(&f, lead.id).await;
        assert_eq!(entries.len(), 2);
        let last = &entries[0];
        assert_eq!(last.old_status.as_deref(), Some("nuovo"));
        assert_eq!(last.new_status.as_deref(), Some("venduto"));
        assert_eq!(last.author_id, f.actor.id);
    }

    #[tokio::test]
    async fn phase_always_follows_target_status() {
        let f = fixture();
        let statuses = f.service.active_statuses().await.unwrap();
        let mut lead = lead_in(&f, "nuovo").await;
        for target in statuses.iter().rev() {
            if target.id == lead.status_id {
                continue;
            }
            lead = f.service.transition(&lead, &target.id, &f.actor, TransitionOptions::default()).await.unwrap();
            assert_eq!(lead.phase, target.phase);
        }
        // uma entrada por transição, mais a de criação
        assert_eq!(status_changes(&f, lead.id).await.len(), statuses.len() + 1);
    }

    #[tokio::test]
    async fn advisory_rejection_needs_force() {
        let f = fixture();
        f.service
            .update_status(
                "nuovo",
                StatusUpdate { allowed_transitions: Some(vec!["contattato".into()]), ..Default::default() },
            )
            .await
            .unwrap();
        let lead = lead_in(&f, "nuovo").await;

        let err = f.service.transition(&lead, "perso", &f.actor, TransitionOptions::default()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::TransitionRejectedAdvisory { ref recommended, .. } if recommended == &vec!["contattato".to_string()]
        ));
        // rejeição não grava nada
        assert_eq!(status_changes(&f, lead.id).await.len(), 1);

        let forced = f.service.transition(&lead, "perso", &f.actor, TransitionOptions::forced()).await.unwrap();
        assert_eq!(forced.phase, Phase::Closing);
        assert_eq!(status_changes(&f, lead.id).await.len(), 2);
    }

    #[tokio::test]
    async fn same_column_is_a_noop() {
        let f = fixture();
        let lead = lead_in(&f, "nuovo").await;
        assert!(matches!(
            f.service.transition(&lead, "nuovo", &f.actor, TransitionOptions::default()).await,
            Err(AppError::TransitionNoop(_))
        ));
    }

    #[tokio::test]
    async fn inactive_target_is_refused() {
        let f = fixture();
        f.service.set_active("perso", false).await.unwrap();
        let lead = lead_in(&f, "nuovo").await;
        assert!(matches!(
            f.service.transition(&lead, "perso", &f.actor, TransitionOptions::default()).await,
            Err(AppError::StatusInactive(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_status_moves_leads_to_default() {
        let f = fixture();
        f.service
            .update_status(
                "contattato",
                StatusUpdate { allowed_transitions: Some(vec!["trattativa".into()]), ..Default::default() },
            )
            .await
            .unwrap();
        let a = lead_in(&f, "trattativa").await;
        let b = lead_in(&f, "trattativa").await;

        let moved = f.service.delete_status("trattativa").await.unwrap();
        assert_eq!(moved, 2);

        let leads = f.stores.leads.list_leads(&LeadFilter::default()).await.unwrap();
        for id in [a.id, b.id] {
            let lead = leads.iter().find(|l| l.id == id).unwrap();
            assert_eq!(lead.status_id, "nuovo");
            assert_eq!(lead.phase, Phase::Contact);
            // sem entrada por lead
            assert_eq!(status_changes(&f, id).await.len(), 1);
        }
        assert!(f.service.get_status("contattato").await.unwrap().allowed_transitions.is_empty());
    }

    #[tokio::test]
    async fn default_status_is_locked() {
        let f = fixture();
        assert!(matches!(f.service.delete_status("nuovo").await, Err(AppError::DefaultStatusLocked(_))));
        assert!(matches!(f.service.set_active("nuovo", false).await, Err(AppError::DefaultStatusLocked(_))));
    }

    #[tokio::test]
    async fn sold_status_is_locked_once_configured() {
        let f = fixture();
        assert!(f.service.set_active("venduto", false).await.is_ok());
        f.service.set_active("venduto", true).await.unwrap();

        let locked = f.service.clone().with_sold_status("venduto");
        assert!(matches!(locked.set_active("venduto", false).await, Err(AppError::SoldStatusLocked(_))));
        assert!(matches!(locked.delete_status("venduto").await, Err(AppError::SoldStatusLocked(_))));
        assert!(locked.get_status("venduto").await.unwrap().active);
        // reativar continua permitido
        assert!(locked.set_active("venduto", true).await.is_ok());
    }

    #[tokio::test]
    async fn create_status_slugs_and_appends() {
        let f = fixture();
        let created = f
            .service
            .create_status(NewStatus {
                name: "Da Richiamare".into(),
                color: "#F59E0B".into(),
                phase: Phase::Contact,
                closes_lead: false,
            })
            .await
            .unwrap();
        assert_eq!(created.id, "da_richiamare");
        assert_eq!(created.position, 12);

        let dup = f
            .service
            .create_status(NewStatus {
                name: "da richiamare".into(),
                color: "#000000".into(),
                phase: Phase::Contact,
                closes_lead: false,
            })
            .await;
        assert!(matches!(dup, Err(AppError::StatusAlreadyExists(_))));
    }

    #[tokio::test]
    async fn phase_change_cascades_to_leads() {
        let f = fixture();
        let lead = lead_in(&f, "contattato").await;
        f.service
            .update_status("contattato", StatusUpdate { phase: Some(Phase::Analysis), ..Default::default() })
            .await
            .unwrap();
        let stored = f.stores.leads.get_lead(lead.id).await.unwrap().unwrap();
        assert_eq!(stored.phase, Phase::Analysis);
    }

    #[tokio::test]
    async fn reorder_appends_missing_ids() {
        let f = fixture();
        let ordered = f.service.reorder(vec!["perso".into(), "venduto".into()]).await.unwrap();
        assert_eq!(ordered[0].id, "perso");
        assert_eq!(ordered[1].id, "venduto");
        assert_eq!(ordered[2].id, "nuovo");
        let positions: Vec<i32> = ordered.iter().map(|s| s.position).collect();
        assert_eq!(positions, (1..=11).collect::<Vec<_>>());
    }
}
