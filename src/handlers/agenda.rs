// src/handlers/agenda.rs

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
        rbac::{CanViewAgenda, RequireAction},
    },
    models::agenda::{AgendaQuery, Appointment, AppointmentPayload, CompletedPayload},
};

// GET /api/appointments
#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "Agenda",
    params(AgendaQuery),
    responses(
        (status = 200, description = "Compromissos em ordem de início", body = Vec<Appointment>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_appointments(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewAgenda>,
    Query(query): Query<AgendaQuery>,
) -> Result<impl IntoResponse, ApiError> {

    let appointments = app_state
        .agenda_service
        .list(&query, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(appointments)))
}

// POST /api/appointments
#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "Agenda",
    request_body = AppointmentPayload,
    responses(
        (status = 201, description = "Compromisso criado", body = Appointment),
        (status = 403, description = "Lead fora da carteira do usuário")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewAgenda>,
    Json(payload): Json<AppointmentPayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let appointment = app_state
        .agenda_service
        .create(payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

// PUT /api/appointments/{id}
#[utoipa::path(
    put,
    path = "/api/appointments/{id}",
    tag = "Agenda",
    params(("id" = Uuid, Path, description = "ID do compromisso")),
    request_body = AppointmentPayload,
    responses(
        (status = 200, description = "Compromisso atualizado", body = Appointment),
        (status = 404, description = "Compromisso não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewAgenda>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<AppointmentPayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let appointment = app_state
        .agenda_service
        .update(appointment_id, payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(appointment)))
}

// POST /api/appointments/{id}/completed
#[utoipa::path(
    post,
    path = "/api/appointments/{id}/completed",
    tag = "Agenda",
    params(("id" = Uuid, Path, description = "ID do compromisso")),
    request_body = CompletedPayload,
    responses(
        (status = 200, description = "Estado de conclusão gravado", body = Appointment)
    ),
    security(("api_jwt" = []))
)]
pub async fn set_appointment_completed(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewAgenda>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<CompletedPayload>,
) -> Result<impl IntoResponse, ApiError> {

    let appointment = app_state
        .agenda_service
        .set_completed(appointment_id, payload.completed, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(appointment)))
}

// DELETE /api/appointments/{id}
#[utoipa::path(
    delete,
    path = "/api/appointments/{id}",
    tag = "Agenda",
    params(("id" = Uuid, Path, description = "ID do compromisso")),
    responses(
        (status = 204, description = "Compromisso removido"),
        (status = 404, description = "Compromisso não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewAgenda>,
    Path(appointment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    app_state
        .agenda_service
        .delete(appointment_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
