// src/handlers/backoffice.rs

use axum::{
    extract::{Path, State},
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
        rbac::{CanCreateBoRequest, CanHandleBoRequests, CanViewLeads, RequireAction},
    },
    models::backoffice::{BoRequest, BoResponsePayload, NewBoRequest, UnreadCount},
};

// GET /api/leads/{id}/bo-requests
#[utoipa::path(
    get,
    path = "/api/leads/{id}/bo-requests",
    tag = "Back-office",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Solicitações do lead", body = Vec<BoRequest>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_lead_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewLeads>,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let requests = app_state
        .backoffice_service
        .list_for_lead(lead_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(requests)))
}

// POST /api/leads/{id}/bo-requests
#[utoipa::path(
    post,
    path = "/api/leads/{id}/bo-requests",
    tag = "Back-office",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = NewBoRequest,
    responses(
        (status = 201, description = "Solicitação aberta, aguardando", body = BoRequest)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_request(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanCreateBoRequest>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<NewBoRequest>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .backoffice_service
        .create(lead_id, payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(request)))
}

// GET /api/bo-requests/pending
#[utoipa::path(
    get,
    path = "/api/bo-requests/pending",
    tag = "Back-office",
    responses(
        (status = 200, description = "Aguardando e em andamento, mais antigas primeiro", body = Vec<BoRequest>)
    ),
    security(("api_jwt" = []))
)]
pub async fn pending_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanHandleBoRequests>,
) -> Result<impl IntoResponse, ApiError> {

    let requests = app_state
        .backoffice_service
        .pending()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(requests)))
}

// POST /api/bo-requests/{id}/claim
#[utoipa::path(
    post,
    path = "/api/bo-requests/{id}/claim",
    tag = "Back-office",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    responses(
        (status = 200, description = "Solicitação assumida", body = BoRequest),
        (status = 409, description = "Já assumida por outro operador")
    ),
    security(("api_jwt" = []))
)]
pub async fn claim_request(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanHandleBoRequests>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let request = app_state
        .backoffice_service
        .claim(request_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(request)))
}

// POST /api/bo-requests/{id}/respond
#[utoipa::path(
    post,
    path = "/api/bo-requests/{id}/respond",
    tag = "Back-office",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    request_body = BoResponsePayload,
    responses(
        (status = 200, description = "Solicitação concluída", body = BoRequest),
        (status = 409, description = "A solicitação não está em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn respond_request(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanHandleBoRequests>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<BoResponsePayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .backoffice_service
        .respond(request_id, &payload.response, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(request)))
}

// POST /api/bo-requests/{id}/read
#[utoipa::path(
    post,
    path = "/api/bo-requests/{id}/read",
    tag = "Back-office",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    responses(
        (status = 200, description = "Resposta marcada como lida", body = BoRequest)
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_request_read(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewLeads>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let request = app_state
        .backoffice_service
        .mark_read(request_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(request)))
}

// GET /api/bo-requests/unread-count
#[utoipa::path(
    get,
    path = "/api/bo-requests/unread-count",
    tag = "Back-office",
    responses(
        (status = 200, description = "Respostas ainda não lidas pelo solicitante", body = UnreadCount)
    ),
    security(("api_jwt" = []))
)]
pub async fn unread_count(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, ApiError> {

    let unread = app_state
        .backoffice_service
        .unread_count(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(UnreadCount { unread })))
}
