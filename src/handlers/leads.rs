// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::CurrentActor,
        i18n::Locale,
        rbac::{
            CanBulkDelete, CanChangeStatus, CanCreateLead, CanDeleteLead, CanEditLead, CanImportLeads,
            CanLogActivity, CanReassignLead, CanViewLeads, RequireAction,
        },
    },
    models::{
        lead::{
            BulkDeletePayload, BulkDeleteReport, Document, ImportPayload, ImportReport, IngestOutcome, Lead,
            LeadQuery, LeadUpdate, NewDocument, NewLead, ReassignPayload, StatusChangePayload,
        },
        timeline::{NotePayload, TimeRange, TimelineEntry},
    },
    services::TransitionOptions,
};

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    params(LeadQuery),
    responses(
        (status = 200, description = "Leads visíveis para o perfil", body = Vec<Lead>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewLeads>,
    Query(query): Query<LeadQuery>,
) -> Result<impl IntoResponse, ApiError> {

    let leads = app_state
        .lead_service
        .list(&query, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(leads)))
}

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = NewLead,
    responses(
        (status = 201, description = "Lead criado no status padrão", body = Lead),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanCreateLead>,
    Json(payload): Json<NewLead>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let lead = app_state
        .lead_service
        .create(payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(lead)))
}

// GET /api/leads/{id}
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewLeads>,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let lead = app_state
        .lead_service
        .get(lead_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(lead)))
}

// PATCH /api/leads/{id}
#[utoipa::path(
    patch,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = LeadUpdate,
    responses(
        (status = 200, description = "Lead atualizado", body = Lead)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanEditLead>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<LeadUpdate>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let lead = app_state
        .lead_service
        .update_details(lead_id, payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(lead)))
}

// DELETE /api/leads/{id}
#[utoipa::path(
    delete,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 204, description = "Lead removido com timeline, documentos e pedidos"),
        (status = 403, description = "Somente administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanDeleteLead>,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    app_state
        .lead_service
        .delete(lead_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/leads/bulk-delete
#[utoipa::path(
    post,
    path = "/api/leads/bulk-delete",
    tag = "Leads",
    request_body = BulkDeletePayload,
    responses(
        (status = 200, description = "Removidos e falhas, item a item", body = BulkDeleteReport)
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_delete_leads(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanBulkDelete>,
    Json(payload): Json<BulkDeletePayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .lead_service
        .bulk_delete(&payload.ids, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// ---
// Entrada de leads das campanhas
// ---

// POST /api/leads/ingest
#[utoipa::path(
    post,
    path = "/api/leads/ingest",
    tag = "Leads",
    request_body = NewLead,
    responses(
        (status = 201, description = "Lead criado e distribuído (ou sem consultor, com o motivo)", body = IngestOutcome),
        (status = 422, description = "Campanha desativada")
    ),
    security(("api_jwt" = []))
)]
pub async fn ingest_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanImportLeads>,
    Json(payload): Json<NewLead>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let outcome = app_state
        .lead_service
        .ingest(payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// POST /api/leads/import
#[utoipa::path(
    post,
    path = "/api/leads/import",
    tag = "Leads",
    request_body = ImportPayload,
    responses(
        (status = 200, description = "Resumo da importação", body = ImportReport)
    ),
    security(("api_jwt" = []))
)]
pub async fn import_leads(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanImportLeads>,
    Json(payload): Json<ImportPayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .lead_service
        .import(payload.campaign_id, payload.rows, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// ---
// Pipeline e atividades
// ---

// POST /api/leads/{id}/status
#[utoipa::path(
    post,
    path = "/api/leads/{id}/status",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = StatusChangePayload,
    responses(
        (status = 200, description = "Lead no novo status", body = Lead),
        (status = 409, description = "Transição não recomendada: repetir com force=true")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_lead_status(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanChangeStatus>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<StatusChangePayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let options = TransitionOptions { force: payload.force, note: payload.note };
    let lead = app_state
        .lead_service
        .change_status(lead_id, &payload.status_id, options, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(lead)))
}

// POST /api/leads/{id}/reassign
#[utoipa::path(
    post,
    path = "/api/leads/{id}/reassign",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = ReassignPayload,
    responses(
        (status = 200, description = "Lead com o novo consultor", body = Lead)
    ),
    security(("api_jwt" = []))
)]
pub async fn reassign_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanReassignLead>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<ReassignPayload>,
) -> Result<impl IntoResponse, ApiError> {

    let lead = app_state
        .lead_service
        .reassign(lead_id, payload.consultant_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(lead)))
}

// POST /api/leads/{id}/notes
#[utoipa::path(
    post,
    path = "/api/leads/{id}/notes",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = NotePayload,
    responses(
        (status = 201, description = "Nota registrada na timeline", body = TimelineEntry)
    ),
    security(("api_jwt" = []))
)]
pub async fn add_note(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanLogActivity>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<NotePayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let entry = app_state
        .lead_service
        .add_note(lead_id, &payload.text, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(entry)))
}

// POST /api/leads/{id}/calls
#[utoipa::path(
    post,
    path = "/api/leads/{id}/calls",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = NotePayload,
    responses(
        (status = 201, description = "Chamada registrada na timeline", body = TimelineEntry)
    ),
    security(("api_jwt" = []))
)]
pub async fn log_call(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanLogActivity>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<NotePayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let entry = app_state
        .lead_service
        .log_call(lead_id, &payload.text, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(entry)))
}

// GET /api/leads/{id}/documents
#[utoipa::path(
    get,
    path = "/api/leads/{id}/documents",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Documentos do lead", body = Vec<Document>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewLeads>,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let documents = app_state
        .lead_service
        .list_documents(lead_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(documents)))
}

// POST /api/leads/{id}/documents
#[utoipa::path(
    post,
    path = "/api/leads/{id}/documents",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = NewDocument,
    responses(
        (status = 201, description = "Metadados do documento gravados", body = Document)
    ),
    security(("api_jwt" = []))
)]
pub async fn attach_document(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanLogActivity>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<NewDocument>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let document = app_state
        .lead_service
        .attach_document(lead_id, payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(document)))
}

// GET /api/leads/{id}/timeline
#[utoipa::path(
    get,
    path = "/api/leads/{id}/timeline",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead"), TimeRange),
    responses(
        (status = 200, description = "Histórico do lead, mais recentes primeiro", body = Vec<TimelineEntry>)
    ),
    security(("api_jwt" = []))
)]
pub async fn lead_timeline(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewLeads>,
    Path(lead_id): Path<Uuid>,
    Query(range): Query<TimeRange>,
) -> Result<impl IntoResponse, ApiError> {

    let entries = app_state
        .lead_service
        .timeline(lead_id, &range, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(entries)))
}
