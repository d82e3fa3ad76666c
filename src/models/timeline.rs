// src/models/timeline.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};

use crate::models::auth::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "timeline_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    StatusChange,
    Note,
    Call,
    Document,
    BoRequest,
    BoResponse,
    Appointment,
}

/// Registro imutável do histórico de um lead. Só existe `append`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub kind: TimelineKind,
    pub author_id: Uuid,
    pub author_name: String,
    pub note: String,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TimelineEntry {
    fn new(lead_id: Uuid, kind: TimelineKind, author: &Actor, note: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lead_id,
            kind,
            author_id: author.id,
            author_name: author.display_name.clone(),
            note: note.into(),
            old_status: None,
            new_status: None,
            created_at: Utc::now(),
        }
    }

    pub fn status_change(
        lead_id: Uuid,
        author: &Actor,
        old_status: Option<&str>,
        new_status: &str,
        note: impl Into<String>,
    ) -> Self {
        Self {
            old_status: old_status.map(str::to_string),
            new_status: Some(new_status.to_string()),
            ..Self::new(lead_id, TimelineKind::StatusChange, author, note)
        }
    }

    pub fn note(lead_id: Uuid, author: &Actor, text: impl Into<String>) -> Self {
        Self::new(lead_id, TimelineKind::Note, author, text)
    }

    pub fn call(lead_id: Uuid, author: &Actor, text: impl Into<String>) -> Self {
        Self::new(lead_id, TimelineKind::Call, author, text)
    }

    pub fn document(lead_id: Uuid, author: &Actor, text: impl Into<String>) -> Self {
        Self::new(lead_id, TimelineKind::Document, author, text)
    }

    pub fn bo_request(lead_id: Uuid, author: &Actor, text: impl Into<String>) -> Self {
        Self::new(lead_id, TimelineKind::BoRequest, author, text)
    }

    pub fn bo_response(lead_id: Uuid, author: &Actor, text: impl Into<String>) -> Self {
        Self::new(lead_id, TimelineKind::BoResponse, author, text)
    }

    pub fn appointment(lead_id: Uuid, author: &Actor, text: impl Into<String>) -> Self {
        Self::new(lead_id, TimelineKind::Appointment, author, text)
    }

    pub fn at(mut self, when: DateTime<Utc>) -> Self {
        self.created_at = when;
        self
    }
}

/// Intervalo semiaberto `[from, to)`; limites ausentes não restringem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|f| at >= f) && self.to.is_none_or(|t| at < t)
    }
}

#[derive(Debug, serde::Deserialize, validator::Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    #[validate(length(min = 1, max = 2000, message = "O texto não pode ser vazio"))]
    pub text: String,
}
