// src/handlers/announcements.rs

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
        rbac::{CanPublishAnnouncements, RequireAction},
    },
    models::{
        announcement::{AnnouncementView, NewAnnouncement},
        backoffice::UnreadCount,
    },
};

// GET /api/announcements
#[utoipa::path(
    get,
    path = "/api/announcements",
    tag = "Comunicados",
    responses(
        (status = 200, description = "Comunicados, mais recentes primeiro, com o estado de leitura do usuário", body = Vec<AnnouncementView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_announcements(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, ApiError> {

    let announcements = app_state
        .announcement_service
        .list(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(announcements)))
}

// POST /api/announcements
#[utoipa::path(
    post,
    path = "/api/announcements",
    tag = "Comunicados",
    request_body = NewAnnouncement,
    responses(
        (status = 201, description = "Comunicado publicado", body = AnnouncementView),
        (status = 403, description = "Só admin e back-office publicam")
    ),
    security(("api_jwt" = []))
)]
pub async fn publish_announcement(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanPublishAnnouncements>,
    Json(payload): Json<NewAnnouncement>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let announcement = app_state
        .announcement_service
        .publish(payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(announcement)))
}

// POST /api/announcements/{id}/read
#[utoipa::path(
    post,
    path = "/api/announcements/{id}/read",
    tag = "Comunicados",
    params(("id" = Uuid, Path, description = "ID do comunicado")),
    responses(
        (status = 200, description = "Comunicado marcado como lido", body = AnnouncementView),
        (status = 404, description = "Comunicado não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_announcement_read(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    Path(announcement_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let announcement = app_state
        .announcement_service
        .mark_read(announcement_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(announcement)))
}

// GET /api/announcements/unread-count
#[utoipa::path(
    get,
    path = "/api/announcements/unread-count",
    tag = "Comunicados",
    responses(
        (status = 200, description = "Comunicados ainda não lidos pelo usuário", body = UnreadCount)
    ),
    security(("api_jwt" = []))
)]
pub async fn unread_announcements(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, ApiError> {

    let unread = app_state
        .announcement_service
        .unread_count(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(UnreadCount { unread })))
}
