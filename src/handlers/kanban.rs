// src/handlers/kanban.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    kanban::{BoardView, DropOutcome, KanbanBoard},
    middleware::{
        auth::CurrentActor,
        i18n::Locale,
        rbac::{CanBulkDelete, CanChangeStatus, CanViewKanban, RequireAction},
    },
    models::{
        auth::Actor,
        lead::{BulkDeletePayload, BulkDeleteReport, Lead, LeadQuery},
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub lead_id: Uuid,
    #[validate(length(min = 1, message = "Status de destino obrigatório"))]
    pub to_status: String,
    /// Confirma uma transição fora das recomendadas.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveResult {
    /// `false` quando o card foi solto na própria coluna.
    pub moved: bool,
    pub lead: Option<Lead>,
}

async fn load_board(app_state: &AppState, actor: Actor, query: LeadQuery) -> Result<KanbanBoard, AppError> {
    KanbanBoard::load(app_state.lead_service.clone(), app_state.pipeline_service.clone(), actor, query).await
}

// GET /api/kanban
#[utoipa::path(
    get,
    path = "/api/kanban",
    tag = "Kanban",
    params(LeadQuery),
    responses(
        (status = 200, description = "Colunas ativas com os cards visíveis", body = BoardView)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_board(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewKanban>,
    Query(query): Query<LeadQuery>,
) -> Result<impl IntoResponse, ApiError> {

    let board = load_board(&app_state, actor, query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(board.snapshot())))
}

// POST /api/kanban/moves
#[utoipa::path(
    post,
    path = "/api/kanban/moves",
    tag = "Kanban",
    request_body = MovePayload,
    responses(
        (status = 200, description = "Movimento gravado (ou nada a fazer)", body = MoveResult),
        (status = 409, description = "Transição não recomendada: repetir com force=true")
    ),
    security(("api_jwt" = []))
)]
pub async fn move_card(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanChangeStatus>,
    Json(payload): Json<MovePayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut board = load_board(&app_state, actor, LeadQuery::default())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let outcome = board.move_card(payload.lead_id, &payload.to_status, payload.force).await;
    let result = match outcome {
        DropOutcome::Committed(lead) => MoveResult { moved: true, lead: Some(lead) },
        DropOutcome::NoOp => MoveResult { moved: false, lead: board.card(payload.lead_id).cloned() },
        DropOutcome::NeedsConfirmation { from, to, recommended } => {
            return Err(AppError::TransitionRejectedAdvisory { from, to, recommended }
                .to_api_error(&locale, &app_state.i18n_store));
        }
        DropOutcome::Reverted { error } => {
            return Err(error.to_api_error(&locale, &app_state.i18n_store));
        }
    };

    Ok((StatusCode::OK, Json(result)))
}

// POST /api/kanban/bulk-delete
#[utoipa::path(
    post,
    path = "/api/kanban/bulk-delete",
    tag = "Kanban",
    request_body = BulkDeletePayload,
    responses(
        (status = 200, description = "Cards selecionados removidos, um a um", body = BulkDeleteReport)
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_delete_cards(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanBulkDelete>,
    Json(payload): Json<BulkDeletePayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut board = load_board(&app_state, actor, LeadQuery::default())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = board
        .bulk_delete(&payload.ids)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
