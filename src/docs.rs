// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::kanban;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Sistema ---
        handlers::health::health,

        // --- Leads ---
        handlers::leads::list_leads,
        handlers::leads::create_lead,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::delete_lead,
        handlers::leads::bulk_delete_leads,
        handlers::leads::ingest_lead,
        handlers::leads::import_leads,
        handlers::leads::change_lead_status,
        handlers::leads::reassign_lead,
        handlers::leads::add_note,
        handlers::leads::log_call,
        handlers::leads::list_documents,
        handlers::leads::attach_document,
        handlers::leads::lead_timeline,

        // --- Pipeline ---
        handlers::statuses::list_statuses,
        handlers::statuses::create_status,
        handlers::statuses::update_status,
        handlers::statuses::set_status_active,
        handlers::statuses::reorder_statuses,
        handlers::statuses::delete_status,
        handlers::statuses::check_transition,

        // --- Campanhas ---
        handlers::campaigns::list_campaigns,
        handlers::campaigns::create_campaign,
        handlers::campaigns::update_campaign,
        handlers::campaigns::set_campaign_active,
        handlers::campaigns::save_distribution,
        handlers::campaigns::effective_distribution,

        // --- Kanban ---
        handlers::kanban::get_board,
        handlers::kanban::move_card,
        handlers::kanban::bulk_delete_cards,

        // --- Back-office ---
        handlers::backoffice::list_lead_requests,
        handlers::backoffice::create_request,
        handlers::backoffice::pending_requests,
        handlers::backoffice::claim_request,
        handlers::backoffice::respond_request,
        handlers::backoffice::mark_request_read,
        handlers::backoffice::unread_count,

        // --- Contratos ---
        handlers::contracts::get_contract,
        handlers::contracts::save_contract,

        // --- Agenda ---
        handlers::agenda::list_appointments,
        handlers::agenda::create_appointment,
        handlers::agenda::update_appointment,
        handlers::agenda::set_appointment_completed,
        handlers::agenda::delete_appointment,

        // --- Comunicados ---
        handlers::announcements::list_announcements,
        handlers::announcements::publish_announcement,
        handlers::announcements::mark_announcement_read,
        handlers::announcements::unread_announcements,

        // --- Relatórios ---
        handlers::reports::activity_report,
        handlers::reports::pipeline_report,

        // --- Usuário ---
        handlers::me::my_actions,
    ),
    components(
        schemas(
            // --- Auth / RBAC ---
            models::auth::Role,
            models::auth::Actor,
            models::rbac::Action,
            handlers::me::MyActions,

            // --- Leads ---
            models::lead::Priority,
            models::lead::ClientType,
            models::lead::DocumentKind,
            models::lead::Lead,
            models::lead::Document,
            models::lead::NewDocument,
            models::lead::NewLead,
            models::lead::LeadUpdate,
            models::lead::Period,
            models::lead::IngestOutcome,
            models::lead::ImportFailure,
            models::lead::ImportReport,
            models::lead::BulkDeleteFailure,
            models::lead::BulkDeleteReport,

            // --- Timeline ---
            models::timeline::TimelineKind,
            models::timeline::TimelineEntry,

            // --- Pipeline ---
            models::pipeline::Phase,
            models::pipeline::Status,
            models::pipeline::TransitionCheck,
            models::pipeline::NewStatus,
            models::pipeline::StatusUpdate,
            handlers::statuses::StatusDeleted,

            // --- Campanhas ---
            models::campaign::Campaign,
            models::campaign::EffectiveShare,
            models::campaign::NewCampaign,
            models::campaign::CampaignUpdate,
            models::campaign::DistributionPayload,

            // --- Kanban ---
            kanban::BoardMode,
            kanban::BoardColumn,
            kanban::BoardView,
            handlers::kanban::MoveResult,

            // --- Back-office ---
            models::backoffice::BoRequestType,
            models::backoffice::BoRequestState,
            models::backoffice::BoRequest,
            models::backoffice::NewBoRequest,
            models::backoffice::BoResponsePayload,
            models::backoffice::UnreadCount,

            // --- Contratos ---
            models::contract::Contract,
            models::contract::ContractTerms,

            // --- Agenda ---
            models::agenda::AppointmentKind,
            models::agenda::Appointment,
            models::agenda::AppointmentPayload,
            models::agenda::CompletedPayload,

            // --- Comunicados ---
            models::announcement::Announcement,
            models::announcement::AnnouncementView,
            models::announcement::NewAnnouncement,

            // --- Relatórios ---
            models::report::ActivityRow,
            models::report::FirstContactRow,
            models::report::ActivityReport,
            models::report::PipelineColumnCount,
            models::report::PipelineSnapshot,

            // --- Payloads ---
            models::lead::ReassignPayload,
            models::lead::StatusChangePayload,
            models::lead::ImportPayload,
            models::lead::BulkDeletePayload,
            models::timeline::NotePayload,
            handlers::statuses::SetActivePayload,
            handlers::statuses::ReorderPayload,
            handlers::kanban::MovePayload,
        )
    ),
    tags(
        (name = "Sistema", description = "Saúde do serviço"),
        (name = "Leads", description = "Leads, atividades e documentos"),
        (name = "Pipeline", description = "Status do pipeline e transições recomendadas"),
        (name = "Campanhas", description = "Campanhas e distribuição ponderada de leads"),
        (name = "Kanban", description = "Quadro de leads por status"),
        (name = "Back-office", description = "Solicitações entre consultor e back-office"),
        (name = "Contratos", description = "Contratos de locação"),
        (name = "Agenda", description = "Compromissos e prazos de cada usuário"),
        (name = "Comunicados", description = "Avisos internos com leitura por usuário"),
        (name = "Relatórios", description = "Atividade e pipeline derivados da timeline"),
        (name = "Usuário", description = "Perfil e ações visíveis")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/leads/{id}/status",
            "/api/statuses/check",
            "/api/campaigns/{id}/distribution",
            "/api/kanban/moves",
            "/api/bo-requests/{id}/claim",
            "/api/leads/{id}/contract",
            "/api/reports/activity",
            "/api/appointments/{id}/completed",
            "/api/announcements/unread-count",
            "/api/me/actions",
        ] {
            assert!(doc.paths.paths.contains_key(path), "rota sem documentação: {path}");
        }
    }
}
