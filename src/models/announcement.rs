// src/models/announcement.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

// Comunicado interno para toda a equipe, com quem já leu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Uuid,
    #[schema(example = "Nuovi listini Arval")]
    pub title: String,
    pub message: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub read_by: Vec<Uuid>,
}

impl Announcement {
    pub fn is_read_by(&self, user_id: Uuid) -> bool {
        self.read_by.contains(&user_id)
    }
}

/// Comunicado como o usuário o vê: com o próprio estado de leitura.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementView {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub read: bool,
}

impl AnnouncementView {
    pub fn for_user(announcement: Announcement, user_id: Uuid) -> Self {
        let read = announcement.is_read_by(user_id);
        Self { announcement, read }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnouncement {
    #[validate(length(min = 1, max = 200, message = "Título obrigatório"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "A mensagem não pode ser vazia"))]
    pub message: String,
}
