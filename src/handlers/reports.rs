// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        auth::CurrentActor,
        i18n::Locale,
        rbac::{CanViewReports, RequireAction},
    },
    models::report::{ActivityReport, PipelineSnapshot, ReportQuery},
};

// GET /api/reports/activity
#[utoipa::path(
    get,
    path = "/api/reports/activity",
    tag = "Relatórios",
    params(ReportQuery),
    responses(
        (status = 200, description = "Atividade por pessoa e dia, tirada da timeline", body = ActivityReport)
    ),
    security(("api_jwt" = []))
)]
pub async fn activity_report(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewReports>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {

    let report = app_state
        .report_service
        .activity(&query, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/reports/pipeline
#[utoipa::path(
    get,
    path = "/api/reports/pipeline",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Leads por status", body = PipelineSnapshot)
    ),
    security(("api_jwt" = []))
)]
pub async fn pipeline_report(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentActor(actor): CurrentActor,
    _guard: RequireAction<CanViewReports>,
) -> Result<impl IntoResponse, ApiError> {

    let snapshot = app_state
        .report_service
        .pipeline_snapshot(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(snapshot)))
}
