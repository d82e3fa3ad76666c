// src/handlers/contracts.rs

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
        rbac::{CanManageContracts, RequireAction},
    },
    models::contract::{Contract, ContractTerms},
};

// GET /api/leads/{id}/contract
#[utoipa::path(
    get,
    path = "/api/leads/{id}/contract",
    tag = "Contratos",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Contrato do lead", body = Contract),
        (status = 404, description = "O lead ainda não tem contrato")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanManageContracts>,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let contract = app_state
        .contract_service
        .get(lead_id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(contract)))
}

// PUT /api/leads/{id}/contract
// A primeira gravação fecha o lead como vendido.
#[utoipa::path(
    put,
    path = "/api/leads/{id}/contract",
    tag = "Contratos",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = ContractTerms,
    responses(
        (status = 200, description = "Contrato gravado", body = Contract)
    ),
    security(("api_jwt" = []))
)]
pub async fn save_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanManageContracts>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<ContractTerms>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let contract = app_state
        .contract_service
        .save(lead_id, payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(contract)))
}
