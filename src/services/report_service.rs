// src/services/report_service.rs

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{Actor, Role},
        lead::LeadQuery,
        report::{ActivityReport, ActivityRow, FirstContactRow, PipelineColumnCount, PipelineSnapshot, ReportQuery},
        timeline::{TimeRange, TimelineEntry, TimelineKind},
    },
    services::{lead_service::LeadService, pipeline_service::PipelineService, timeline_service::TimelineService},
};

/// Relatórios derivados: nada aqui grava, tudo sai da timeline e dos leads.
#[derive(Clone)]
pub struct ReportService {
    timeline: TimelineService,
    leads: LeadService,
    pipeline: PipelineService,
}

impl ReportService {
    pub fn new(timeline: TimelineService, leads: LeadService, pipeline: PipelineService) -> Self {
        Self { timeline, leads, pipeline }
    }

    /// Atividade por autor e por dia. O consultor só enxerga a própria.
    pub async fn activity(&self, query: &ReportQuery, actor: &Actor) -> Result<ActivityReport, AppError> {
        let author = match actor.role {
            Role::Consultant => Some(actor.id),
            Role::Admin | Role::BackOffice => query.actor_id,
        };
        let range = TimeRange { from: query.from, to: query.to };

        let entries: Vec<TimelineEntry> = self
            .timeline
            .between(&range)
            .await?
            .into_iter()
            .filter(|e| author.is_none_or(|a| e.author_id == a))
            .collect();

        Ok(ActivityReport {
            from: query.from,
            to: query.to,
            rows: aggregate_activity(&entries),
            first_contacts: first_contacts(&entries, self.pipeline.default_status_id()),
        })
    }

    /// Quantos leads em cada coluna ativa, com o escopo do perfil.
    pub async fn pipeline_snapshot(&self, actor: &Actor) -> Result<PipelineSnapshot, AppError> {
        let statuses = self.pipeline.active_statuses().await?;
        let leads = self.leads.list(&LeadQuery::default(), actor).await?;

        let columns = statuses
            .into_iter()
            .map(|s| PipelineColumnCount {
                count: leads.iter().filter(|l| l.status_id == s.id).count() as u64,
                status_id: s.id,
                name: s.name,
                phase: s.phase,
            })
            .collect();

        Ok(PipelineSnapshot {
            columns,
            unassigned: leads.iter().filter(|l| l.consultant_id.is_none()).count() as u64,
            total: leads.len() as u64,
        })
    }
}

pub fn aggregate_activity(entries: &[TimelineEntry]) -> Vec<ActivityRow> {
    let mut rows: BTreeMap<(chrono::NaiveDate, Uuid), ActivityRow> = BTreeMap::new();

    for entry in entries {
        let day = entry.created_at.date_naive();
        let counted = matches!(entry.kind, TimelineKind::Call | TimelineKind::StatusChange | TimelineKind::Note);
        if !counted {
            continue;
        }
        let row = rows.entry((day, entry.author_id)).or_insert_with(|| ActivityRow {
            actor_id: entry.author_id,
            actor_name: entry.author_name.clone(),
            day,
            ..Default::default()
        });
        match entry.kind {
            TimelineKind::Call => row.calls += 1,
            // criação do lead não é mudança de status
            TimelineKind::StatusChange if entry.old_status.is_none() => row.leads_created += 1,
            TimelineKind::StatusChange => row.status_changes += 1,
            TimelineKind::Note => row.notes += 1,
            _ => {}
        }
    }

    rows.into_values().collect()
}

/// Primeiro contato = saída do status inicial.
pub fn first_contacts(entries: &[TimelineEntry], default_status_id: &str) -> Vec<FirstContactRow> {
    let mut counts: BTreeMap<Uuid, FirstContactRow> = BTreeMap::new();
    for entry in entries
        .iter()
        .filter(|e| e.kind == TimelineKind::StatusChange && e.old_status.as_deref() == Some(default_status_id))
    {
        counts
            .entry(entry.author_id)
            .or_insert_with(|| FirstContactRow {
                actor_id: entry.author_id,
                actor_name: entry.author_name.clone(),
                count: 0,
            })
            .count += 1;
    }
    let mut rows: Vec<FirstContactRow> = counts.into_values().collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.actor_name.cmp(&b.actor_name)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn actor(name: &str) -> Actor {
        Actor::new(Uuid::new_v4(), name, Role::Consultant)
    }

    #[test]
    fn activity_is_grouped_by_day_and_author() {
        let anna = actor("Anna");
        let bruno = actor("Bruno");
        let lead = Uuid::new_v4();
        let monday = Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();

        let entries = vec![
            TimelineEntry::call(lead, &anna, "").at(monday),
            TimelineEntry::call(lead, &anna, "").at(monday),
            TimelineEntry::note(lead, &anna, "richiamare").at(monday),
            TimelineEntry::status_change(lead, &bruno, Some("nuovo"), "contattato", "").at(monday),
            TimelineEntry::document(lead, &bruno, "patente.pdf").at(monday),
            TimelineEntry::call(lead, &anna, "").at(tuesday),
        ];

        let rows = aggregate_activity(&entries);
        assert_eq!(rows.len(), 3);
        let anna_monday = rows.iter().find(|r| r.actor_id == anna.id && r.day == monday.date_naive()).unwrap();
        assert_eq!((anna_monday.calls, anna_monday.notes, anna_monday.status_changes), (2, 1, 0));
        let bruno_monday = rows.iter().find(|r| r.actor_id == bruno.id).unwrap();
        assert_eq!(bruno_monday.status_changes, 1);
        assert_eq!(bruno_monday.calls, 0);
    }

    #[test]
    fn lead_creation_has_its_own_counter() {
        let anna = actor("Anna");
        let lead = Uuid::new_v4();
        let day = Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
        let entries = vec![
            TimelineEntry::status_change(lead, &anna, None, "nuovo", "Lead creato").at(day),
            TimelineEntry::status_change(Uuid::new_v4(), &anna, None, "nuovo", "Lead creato").at(day),
            TimelineEntry::status_change(lead, &anna, Some("nuovo"), "contattato", "").at(day),
        ];
        let rows = aggregate_activity(&entries);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].leads_created, 2);
        assert_eq!(rows[0].status_changes, 1);
    }

    #[test]
    fn first_contacts_count_exits_from_default() {
        let anna = actor("Anna");
        let lead = Uuid::new_v4();
        let entries = vec![
            TimelineEntry::status_change(lead, &anna, None, "nuovo", "Lead creato"),
            TimelineEntry::status_change(lead, &anna, Some("nuovo"), "contattato", ""),
            TimelineEntry::status_change(lead, &anna, Some("contattato"), "trattativa", ""),
            TimelineEntry::status_change(Uuid::new_v4(), &anna, Some("nuovo"), "perso", ""),
        ];
        let rows = first_contacts(&entries, "nuovo");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 2);
    }
}
