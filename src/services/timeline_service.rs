// src/services/timeline_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::ReadRetry},
    db::store::TimelineStore,
    models::timeline::{TimeRange, TimelineEntry},
};

// Histórico append-only: não existe update nem delete.
#[derive(Clone)]
pub struct TimelineService {
    timeline: Arc<dyn TimelineStore>,
    retry: ReadRetry,
}

impl TimelineService {
    pub fn new(timeline: Arc<dyn TimelineStore>, retry: ReadRetry) -> Self {
        Self { timeline, retry }
    }

    pub async fn append(&self, entry: &TimelineEntry) -> Result<(), AppError> {
        self.timeline.append(entry).await
    }

    /// Mais recentes primeiro.
    pub async fn list(&self, lead_id: Uuid, range: &TimeRange) -> Result<Vec<TimelineEntry>, AppError> {
        self.retry.run("timeline", || self.timeline.list_for_lead(lead_id, range)).await
    }

    /// Entradas de todos os leads no período, em ordem cronológica.
    pub async fn between(&self, range: &TimeRange) -> Result<Vec<TimelineEntry>, AppError> {
        self.retry.run("timeline do período", || self.timeline.list_between(range)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::{
            auth::{Actor, Role},
            timeline::TimelineKind,
        },
    };
    use chrono::{Duration as Span, Utc};
    use std::time::Duration;

    fn service(store: &MemoryStore) -> TimelineService {
        TimelineService::new(store.stores().timeline, ReadRetry::new(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn lead_history_is_newest_first_and_range_is_half_open() {
        let store = MemoryStore::new();
        let timeline = service(&store);
        let author = Actor::new(Uuid::new_v4(), "Marco Rossi", Role::Consultant);
        let lead_id = Uuid::new_v4();
        let start = Utc::now() - Span::hours(3);

        let first = TimelineEntry::status_change(lead_id, &author, None, "nuovo", "Lead creato").at(start);
        let call = TimelineEntry::call(lead_id, &author, "Richiamare domani").at(start + Span::hours(1));
        let note = TimelineEntry::note(lead_id, &author, "Vuole un SUV").at(start + Span::hours(2));
        let other_lead = TimelineEntry::note(Uuid::new_v4(), &author, "Altro lead").at(start);
        for entry in [&first, &call, &note, &other_lead] {
            timeline.append(entry).await.unwrap();
        }

        let all = timeline.list(lead_id, &TimeRange::default()).await.unwrap();
        let kinds: Vec<TimelineKind> = all.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![TimelineKind::Note, TimelineKind::Call, TimelineKind::StatusChange]);

        let window = TimeRange { from: Some(start), to: Some(start + Span::hours(2)) };
        let ids: Vec<Uuid> = timeline.list(lead_id, &window).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![call.id, first.id]);

        let everything = timeline.between(&TimeRange::default()).await.unwrap();
        assert_eq!(everything.len(), 4);
        assert!(everything.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn append_is_not_retried() {
        let store = MemoryStore::new();
        let timeline = service(&store);
        let author = Actor::new(Uuid::new_v4(), "Giulia Neri", Role::BackOffice);
        store.set_unavailable(true);

        let entry = TimelineEntry::note(Uuid::new_v4(), &author, "nota");
        assert!(matches!(timeline.append(&entry).await, Err(AppError::PersistenceUnavailable)));

        store.set_unavailable(false);
        assert!(timeline.between(&TimeRange::default()).await.unwrap().is_empty());
    }
}
