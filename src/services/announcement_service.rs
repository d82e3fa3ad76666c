// src/services/announcement_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::ReadRetry},
    db::store::AnnouncementStore,
    models::{
        announcement::{Announcement, AnnouncementView, NewAnnouncement},
        auth::{Actor, Role},
    },
};

/// Comunicados da gestão para a equipe, com leitura por usuário.
#[derive(Clone)]
pub struct AnnouncementService {
    announcements: Arc<dyn AnnouncementStore>,
    retry: ReadRetry,
}

impl AnnouncementService {
    pub fn new(announcements: Arc<dyn AnnouncementStore>, retry: ReadRetry) -> Self {
        Self { announcements, retry }
    }

    /// Quem publica já conta como leitor.
    pub async fn publish(&self, payload: NewAnnouncement, author: &Actor) -> Result<AnnouncementView, AppError> {
        if author.role == Role::Consultant {
            return Err(AppError::Forbidden);
        }

        let announcement = Announcement {
            id: Uuid::new_v4(),
            title: payload.title.trim().to_string(),
            message: payload.message.trim().to_string(),
            author_id: author.id,
            author_name: author.display_name.clone(),
            created_at: Utc::now(),
            read_by: vec![author.id],
        };
        self.announcements.insert_announcement(&announcement).await?;
        tracing::info!("Comunicado {} publicado por {}", announcement.id, author.display_name);
        Ok(AnnouncementView::for_user(announcement, author.id))
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<AnnouncementView>, AppError> {
        let announcements = self.retry.run("comunicados", || self.announcements.list_announcements()).await?;
        Ok(announcements.into_iter().map(|a| AnnouncementView::for_user(a, actor.id)).collect())
    }

    pub async fn mark_read(&self, id: Uuid, actor: &Actor) -> Result<AnnouncementView, AppError> {
        let announcement = self
            .announcements
            .mark_announcement_read(id, actor.id)
            .await?
            .ok_or(AppError::AnnouncementNotFound)?;
        Ok(AnnouncementView::for_user(announcement, actor.id))
    }

    pub async fn unread_count(&self, actor: &Actor) -> Result<u64, AppError> {
        self.retry
            .run("comunicados não lidos", || self.announcements.count_unread_announcements(actor.id))
            .await
    }
}
