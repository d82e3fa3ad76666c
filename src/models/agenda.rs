// src/models/agenda.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::timeline::TimeRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "appointment_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    #[default]
    ClientMeeting,
    FollowUp,
    PersonalDeadline,
    CaseDeadline,
}

impl AppointmentKind {
    pub fn label(self) -> &'static str {
        match self {
            AppointmentKind::ClientMeeting => "Appuntamento cliente",
            AppointmentKind::FollowUp => "Follow-up",
            AppointmentKind::PersonalDeadline => "Scadenza personale",
            AppointmentKind::CaseDeadline => "Scadenza pratica",
        }
    }
}

// Evento da agenda. O lead é opcional; o nome fica copiado para a listagem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub kind: AppointmentKind,
    #[schema(example = "Consegna Fiat 500e")]
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    #[schema(example = 60)]
    pub duration_minutes: i32,
    pub lead_id: Option<Uuid>,
    pub lead_name: Option<String>,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Texto usado na timeline do lead.
    pub fn summary(&self) -> String {
        format!("{}: {} il {}", self.kind.label(), self.title, self.starts_at.format("%d/%m/%Y %H:%M"))
    }
}

fn default_duration() -> i32 {
    60
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPayload {
    #[serde(default)]
    pub kind: AppointmentKind,
    #[validate(length(min = 1, max = 200, message = "Título obrigatório"))]
    pub title: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    pub starts_at: DateTime<Utc>,
    #[validate(range(min = 5, max = 720, message = "Duração entre 5 e 720 minutos"))]
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub lead_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPayload {
    pub completed: bool,
}

/// Filtros da agenda. `consultantId` só vale para admin e back-office.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AgendaQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub consultant_id: Option<Uuid>,
}

/// Filtro já resolvido pelo serviço, entregue ao armazenamento.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub owner_id: Option<Uuid>,
    pub range: TimeRange,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.owner_id.is_none_or(|o| appointment.owner_id == o) && self.range.contains(appointment.starts_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn summary_uses_italian_date_format() {
        let at = Utc.with_ymd_and_hms(2026, 4, 2, 15, 30, 0).unwrap();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            kind: AppointmentKind::FollowUp,
            title: "Richiamare per preventivo".into(),
            description: String::new(),
            starts_at: at,
            duration_minutes: 30,
            lead_id: None,
            lead_name: None,
            owner_id: Uuid::new_v4(),
            owner_name: "Marco Rossi".into(),
            completed: false,
            created_at: at,
            updated_at: at,
        };
        assert_eq!(appointment.summary(), "Follow-up: Richiamare per preventivo il 02/04/2026 15:30");
        assert_eq!(appointment.ends_at(), Utc.with_ymd_and_hms(2026, 4, 2, 16, 0, 0).unwrap());
    }
}
