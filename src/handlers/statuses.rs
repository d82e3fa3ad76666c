// src/handlers/statuses.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{CanChangeStatus, CanManageStatuses, CanViewKanban, RequireAction},
    },
    models::pipeline::{NewStatus, Status, StatusUpdate, TransitionCheck},
};

// ---
// Payloads usados só aqui
// ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetActivePayload {
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPayload {
    #[validate(length(min = 1, message = "A lista de status não pode ser vazia"))]
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusDeleted {
    /// Leads movidos para o status padrão.
    pub reassigned: u64,
}

// GET /api/statuses
#[utoipa::path(
    get,
    path = "/api/statuses",
    tag = "Pipeline",
    responses(
        (status = 200, description = "Todos os status, por posição", body = Vec<Status>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_statuses(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanViewKanban>,
) -> Result<impl IntoResponse, ApiError> {

    let statuses = app_state
        .pipeline_service
        .list_statuses()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(statuses)))
}

// POST /api/statuses
#[utoipa::path(
    post,
    path = "/api/statuses",
    tag = "Pipeline",
    request_body = NewStatus,
    responses(
        (status = 201, description = "Status criado no fim do pipeline", body = Status),
        (status = 409, description = "Já existe um status com este nome")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageStatuses>,
    Json(payload): Json<NewStatus>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let status = app_state
        .pipeline_service
        .create_status(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(status)))
}

// PATCH /api/statuses/{id}
#[utoipa::path(
    patch,
    path = "/api/statuses/{id}",
    tag = "Pipeline",
    params(("id" = String, Path, description = "ID (slug) do status")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status atualizado", body = Status)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageStatuses>,
    Path(status_id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let status = app_state
        .pipeline_service
        .update_status(&status_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(status)))
}

// POST /api/statuses/{id}/active
#[utoipa::path(
    post,
    path = "/api/statuses/{id}/active",
    tag = "Pipeline",
    params(("id" = String, Path, description = "ID (slug) do status")),
    request_body = SetActivePayload,
    responses(
        (status = 200, description = "Status ativado ou desativado", body = Status),
        (status = 409, description = "O status padrão não pode ser desativado")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_status_active(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageStatuses>,
    Path(status_id): Path<String>,
    Json(payload): Json<SetActivePayload>,
) -> Result<impl IntoResponse, ApiError> {

    let status = app_state
        .pipeline_service
        .set_active(&status_id, payload.active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(status)))
}

// PUT /api/statuses/order
#[utoipa::path(
    put,
    path = "/api/statuses/order",
    tag = "Pipeline",
    request_body = ReorderPayload,
    responses(
        (status = 200, description = "Status renumerados na nova ordem", body = Vec<Status>)
    ),
    security(("api_jwt" = []))
)]
pub async fn reorder_statuses(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageStatuses>,
    Json(payload): Json<ReorderPayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let statuses = app_state
        .pipeline_service
        .reorder(payload.ids)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(statuses)))
}

// DELETE /api/statuses/{id}
#[utoipa::path(
    delete,
    path = "/api/statuses/{id}",
    tag = "Pipeline",
    params(("id" = String, Path, description = "ID (slug) do status")),
    responses(
        (status = 200, description = "Status removido; leads movidos para o padrão", body = StatusDeleted),
        (status = 409, description = "O status padrão não pode ser removido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageStatuses>,
    Path(status_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {

    let reassigned = app_state
        .pipeline_service
        .delete_status(&status_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(StatusDeleted { reassigned })))
}

// GET /api/statuses/check?from=&to=
#[utoipa::path(
    get,
    path = "/api/statuses/check",
    tag = "Pipeline",
    params(CheckQuery),
    responses(
        (status = 200, description = "Resultado consultivo da transição", body = TransitionCheck)
    ),
    security(("api_jwt" = []))
)]
pub async fn check_transition(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanChangeStatus>,
    Query(query): Query<CheckQuery>,
) -> Result<impl IntoResponse, ApiError> {

    let check = app_state
        .pipeline_service
        .check_transition(&query.from, &query.to)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(check)))
}
