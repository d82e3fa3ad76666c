// src/handlers/campaigns.rs

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
    handlers::statuses::SetActivePayload,
    middleware::{
        i18n::Locale,
        rbac::{CanManageCampaigns, RequireAction},
    },
    models::campaign::{Campaign, CampaignUpdate, DistributionPayload, EffectiveShare, NewCampaign},
};

// GET /api/campaigns
#[utoipa::path(
    get,
    path = "/api/campaigns",
    tag = "Campanhas",
    responses(
        (status = 200, description = "Campanhas com distribuição e contadores", body = Vec<Campaign>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_campaigns(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageCampaigns>,
) -> Result<impl IntoResponse, ApiError> {

    let campaigns = app_state
        .campaign_service
        .list()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaigns)))
}

// POST /api/campaigns
#[utoipa::path(
    post,
    path = "/api/campaigns",
    tag = "Campanhas",
    request_body = NewCampaign,
    responses(
        (status = 201, description = "Campanha criada com pesos zerados", body = Campaign)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageCampaigns>,
    Json(payload): Json<NewCampaign>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let campaign = app_state
        .campaign_service
        .create(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

// PATCH /api/campaigns/{id}
#[utoipa::path(
    patch,
    path = "/api/campaigns/{id}",
    tag = "Campanhas",
    params(("id" = Uuid, Path, description = "ID da campanha")),
    request_body = CampaignUpdate,
    responses(
        (status = 200, description = "Campanha atualizada", body = Campaign)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageCampaigns>,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<CampaignUpdate>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let campaign = app_state
        .campaign_service
        .update(campaign_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// POST /api/campaigns/{id}/active
#[utoipa::path(
    post,
    path = "/api/campaigns/{id}/active",
    tag = "Campanhas",
    params(("id" = Uuid, Path, description = "ID da campanha")),
    request_body = SetActivePayload,
    responses(
        (status = 200, description = "Campanha ativada ou desativada", body = Campaign)
    ),
    security(("api_jwt" = []))
)]
pub async fn set_campaign_active(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageCampaigns>,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<SetActivePayload>,
) -> Result<impl IntoResponse, ApiError> {

    let campaign = app_state
        .campaign_service
        .set_active(campaign_id, payload.active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// PUT /api/campaigns/{id}/distribution
#[utoipa::path(
    put,
    path = "/api/campaigns/{id}/distribution",
    tag = "Campanhas",
    params(("id" = Uuid, Path, description = "ID da campanha")),
    request_body = DistributionPayload,
    responses(
        (status = 200, description = "Distribuição gravada, contadores preservados", body = Campaign),
        (status = 422, description = "Pesos não somam 100 ou consultor inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_distribution(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageCampaigns>,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<DistributionPayload>,
) -> Result<impl IntoResponse, ApiError> {

    let campaign = app_state
        .campaign_service
        .save_distribution(campaign_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// GET /api/campaigns/{id}/effective-distribution
#[utoipa::path(
    get,
    path = "/api/campaigns/{id}/effective-distribution",
    tag = "Campanhas",
    params(("id" = Uuid, Path, description = "ID da campanha")),
    responses(
        (status = 200, description = "Pesos renormalizados entre os elegíveis", body = Vec<EffectiveShare>)
    ),
    security(("api_jwt" = []))
)]
pub async fn effective_distribution(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireAction<CanManageCampaigns>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let shares = app_state
        .campaign_service
        .effective_distribution(campaign_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(shares)))
}
