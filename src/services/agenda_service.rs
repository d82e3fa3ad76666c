// src/services/agenda_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::ReadRetry},
    db::store::{AppointmentStore, LeadStore},
    models::{
        agenda::{AgendaQuery, Appointment, AppointmentFilter, AppointmentPayload},
        auth::{Actor, Role},
        lead::Lead,
        timeline::{TimeRange, TimelineEntry},
    },
    services::lead_service::can_access,
};

/// Agenda pessoal: cada um vê a sua; admin e back-office podem olhar a de
/// qualquer consultor. Eventos ligados a um lead deixam rastro na timeline.
#[derive(Clone)]
pub struct AgendaService {
    appointments: Arc<dyn AppointmentStore>,
    leads: Arc<dyn LeadStore>,
    retry: ReadRetry,
}

impl AgendaService {
    pub fn new(appointments: Arc<dyn AppointmentStore>, leads: Arc<dyn LeadStore>, retry: ReadRetry) -> Self {
        Self { appointments, leads, retry }
    }

    pub async fn list(&self, query: &AgendaQuery, actor: &Actor) -> Result<Vec<Appointment>, AppError> {
        let owner_id = match actor.role {
            // consultor não escolhe de quem é a agenda
            Role::Consultant => Some(actor.id),
            Role::Admin | Role::BackOffice => query.consultant_id,
        };
        let filter = AppointmentFilter { owner_id, range: TimeRange { from: query.from, to: query.to } };
        self.retry.run("agenda", || self.appointments.list_appointments(&filter)).await
    }

    pub async fn create(&self, payload: AppointmentPayload, actor: &Actor) -> Result<Appointment, AppError> {
        let lead = self.linked_lead(payload.lead_id, actor).await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            kind: payload.kind,
            title: payload.title.trim().to_string(),
            description: payload.description.trim().to_string(),
            starts_at: payload.starts_at,
            duration_minutes: payload.duration_minutes,
            lead_id: lead.as_ref().map(|l| l.id),
            lead_name: lead.as_ref().map(Lead::full_name),
            owner_id: actor.id,
            owner_name: actor.display_name.clone(),
            completed: false,
            created_at: now,
            updated_at: now,
        };
        let entry = timeline_entry(&appointment, actor, "In agenda");

        self.appointments.insert_appointment(&appointment, entry.as_ref()).await?;
        tracing::info!("Compromisso {} criado por {}", appointment.id, actor.display_name);
        Ok(appointment)
    }

    /// Reescreve o evento. O estado de concluído não muda por aqui.
    pub async fn update(&self, id: Uuid, payload: AppointmentPayload, actor: &Actor) -> Result<Appointment, AppError> {
        let current = self.owned(id, actor).await?;
        let lead = if payload.lead_id == current.lead_id {
            None
        } else {
            self.linked_lead(payload.lead_id, actor).await?
        };

        let mut appointment = current.clone();
        appointment.kind = payload.kind;
        appointment.title = payload.title.trim().to_string();
        appointment.description = payload.description.trim().to_string();
        appointment.starts_at = payload.starts_at;
        appointment.duration_minutes = payload.duration_minutes;
        if payload.lead_id != current.lead_id {
            appointment.lead_id = lead.as_ref().map(|l| l.id);
            appointment.lead_name = lead.as_ref().map(Lead::full_name);
        }
        appointment.updated_at = Utc::now();

        let entry = timeline_entry(&appointment, actor, "Agenda aggiornata");
        self.appointments.update_appointment(&appointment, entry.as_ref()).await?;
        Ok(appointment)
    }

    pub async fn set_completed(&self, id: Uuid, completed: bool, actor: &Actor) -> Result<Appointment, AppError> {
        let mut appointment = self.owned(id, actor).await?;
        if appointment.completed == completed {
            return Ok(appointment);
        }

        appointment.completed = completed;
        appointment.updated_at = Utc::now();
        let entry = if completed { timeline_entry(&appointment, actor, "Completato") } else { None };
        self.appointments.update_appointment(&appointment, entry.as_ref()).await?;
        tracing::info!("Compromisso {} concluído = {}", id, completed);
        Ok(appointment)
    }

    pub async fn delete(&self, id: Uuid, actor: &Actor) -> Result<(), AppError> {
        let appointment = self.owned(id, actor).await?;
        let entry = timeline_entry(&appointment, actor, "Annullato");
        if !self.appointments.delete_appointment(id, entry.as_ref()).await? {
            return Err(AppError::AppointmentNotFound);
        }
        tracing::info!("Compromisso {} removido por {}", id, actor.display_name);
        Ok(())
    }

    // Só o dono ou um admin mexe no evento
    async fn owned(&self, id: Uuid, actor: &Actor) -> Result<Appointment, AppError> {
        let appointment = self
            .retry
            .run("compromisso", || self.appointments.get_appointment(id))
            .await?
            .ok_or(AppError::AppointmentNotFound)?;
        if appointment.owner_id != actor.id && !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(appointment)
    }

    async fn linked_lead(&self, lead_id: Option<Uuid>, actor: &Actor) -> Result<Option<Lead>, AppError> {
        let Some(lead_id) = lead_id else {
            return Ok(None);
        };
        let lead = self
            .retry
            .run("lead", || self.leads.get_lead(lead_id))
            .await?
            .ok_or(AppError::LeadNotFound)?;
        if !can_access(actor, &lead) {
            return Err(AppError::Forbidden);
        }
        Ok(Some(lead))
    }
}

fn timeline_entry(appointment: &Appointment, actor: &Actor, prefix: &str) -> Option<TimelineEntry> {
    appointment
        .lead_id
        .map(|lead_id| TimelineEntry::appointment(lead_id, actor, format!("{}: {}", prefix, appointment.summary())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{store::Stores, MemoryStore},
        models::{agenda::AppointmentKind, pipeline::Phase, timeline::TimelineKind},
    };
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::time::Duration;

    struct Fixture {
        stores: Stores,
        service: AgendaService,
        marco: Actor,
        giulia: Actor,
        admin: Actor,
        back_office: Actor,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::seeded();
        let stores = store.stores();
        let service = AgendaService::new(
            stores.appointments.clone(),
            stores.leads.clone(),
            ReadRetry::new(Duration::from_millis(1)),
        );
        let marco = store.add_user("Marco Rossi", Role::Consultant).await.as_actor();
        let giulia = store.add_user("Giulia Neri", Role::Consultant).await.as_actor();
        let admin = store.add_user("Anna Ferri", Role::Admin).await.as_actor();
        let back_office = store.add_user("Paolo Gialli", Role::BackOffice).await.as_actor();
        Fixture { stores, service, marco, giulia, admin, back_office }
    }

    async fn lead_of(f: &Fixture, owner: &Actor) -> Lead {
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
            consultant_id: Some(owner.id),
            status_id: "nuovo".into(),
            phase: Phase::Contact,
            priority: Default::default(),
            requested_vehicle: None,
            needs: None,
            notes: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        let entry = TimelineEntry::status_change(lead.id, owner, None, "nuovo", "");
        f.stores.leads.insert_lead(&lead, &entry).await.unwrap();
        lead
    }

    fn payload(day: u32, lead_id: Option<Uuid>) -> AppointmentPayload {
        AppointmentPayload {
            kind: AppointmentKind::ClientMeeting,
            title: "Prova su strada".into(),
            description: String::new(),
            starts_at: Utc.with_ymd_and_hms(2026, 5, day, 10, 0, 0).unwrap(),
            duration_minutes: 60,
            lead_id,
        }
    }

    async fn appointment_entries(f: &Fixture, lead_id: Uuid) -> Vec<TimelineEntry> {
        f.stores
            .timeline
            .list_for_lead(lead_id, &TimeRange::default())
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == TimelineKind::Appointment)
            .collect()
    }

    #[tokio::test]
    async fn consultants_only_see_their_own_agenda() {
        let f = fixture().await;
        let mine = f.service.create(payload(4, None), &f.marco).await.unwrap();
        f.service.create(payload(5, None), &f.giulia).await.unwrap();

        // o filtro por consultor é ignorado para o próprio consultor
        let query = AgendaQuery { consultant_id: Some(f.giulia.id), ..Default::default() };
        let seen = f.service.list(&query, &f.marco).await.unwrap();
        assert_eq!(seen.iter().map(|a| a.id).collect::<Vec<_>>(), vec![mine.id]);

        let all = f.service.list(&AgendaQuery::default(), &f.back_office).await.unwrap();
        assert_eq!(all.len(), 2);
        let giulias = f.service.list(&query, &f.admin).await.unwrap();
        assert_eq!(giulias.len(), 1);
        assert_eq!(giulias[0].owner_id, f.giulia.id);
    }

    #[tokio::test]
    async fn list_is_ordered_and_bounded_by_range() {
        let f = fixture().await;
        let late = f.service.create(payload(20, None), &f.marco).await.unwrap();
        let early = f.service.create(payload(2, None), &f.marco).await.unwrap();
        f.service.create(payload(28, None), &f.marco).await.unwrap();

        let query = AgendaQuery {
            from: Some(Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2026, 5, 21, 0, 0, 0).unwrap()),
            consultant_id: None,
        };
        let seen: Vec<Uuid> = f.service.list(&query, &f.marco).await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(seen, vec![early.id, late.id]);
    }

    #[tokio::test]
    async fn linked_lead_gets_timeline_entries() {
        let f = fixture().await;
        let lead = lead_of(&f, &f.marco).await;

        let appointment = f.service.create(payload(4, Some(lead.id)), &f.marco).await.unwrap();
        assert_eq!(appointment.lead_name.as_deref(), Some("Luca Bianchi"));
        f.service.set_completed(appointment.id, true, &f.marco).await.unwrap();
        // sem mudança, sem nova entrada
        f.service.set_completed(appointment.id, true, &f.marco).await.unwrap();

        let entries = appointment_entries(&f, lead.id).await;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.note.starts_with("Completato: ")));
        assert!(entries.iter().any(|e| e.note.starts_with("In agenda: ")));
    }

    #[tokio::test]
    async fn cannot_link_a_lead_outside_own_portfolio() {
        let f = fixture().await;
        let giulias_lead = lead_of(&f, &f.giulia).await;
        assert!(matches!(
            f.service.create(payload(4, Some(giulias_lead.id)), &f.marco).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            f.service.create(payload(4, Some(Uuid::new_v4())), &f.marco).await,
            Err(AppError::LeadNotFound)
        ));
        assert!(f.service.list(&AgendaQuery::default(), &f.marco).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_owner_or_admin_can_change() {
        let f = fixture().await;
        let appointment = f.service.create(payload(4, None), &f.marco).await.unwrap();

        assert!(matches!(
            f.service.update(appointment.id, payload(6, None), &f.giulia).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(f.service.delete(appointment.id, &f.back_office).await, Err(AppError::Forbidden)));

        let moved = f.service.update(appointment.id, payload(6, None), &f.admin).await.unwrap();
        assert_eq!(moved.starts_at - appointment.starts_at, ChronoDuration::days(2));
        assert_eq!(moved.owner_id, f.marco.id);

        f.service.delete(appointment.id, &f.marco).await.unwrap();
        assert!(matches!(f.service.delete(appointment.id, &f.marco).await, Err(AppError::AppointmentNotFound)));
    }

    #[tokio::test]
    async fn deleting_the_lead_keeps_the_appointment_unlinked() {
        let f = fixture().await;
        let lead = lead_of(&f, &f.marco).await;
        let appointment = f.service.create(payload(4, Some(lead.id)), &f.marco).await.unwrap();

        assert!(f.stores.leads.delete_cascade(lead.id).await.unwrap());

        let kept = f.stores.appointments.get_appointment(appointment.id).await.unwrap().unwrap();
        assert_eq!(kept.lead_id, None);
        // sem lead, a remoção não tenta escrever na timeline
        f.service.delete(appointment.id, &f.marco).await.unwrap();
    }
}
