// src/handlers/health.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::config::AppState;

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Sistema",
    responses(
        (status = 200, description = "Serviço no ar"),
        (status = 503, description = "Banco de dados inacessível")
    )
)]
pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    let Some(pool) = &app_state.db_pool else {
        return (StatusCode::OK, "OK");
    };
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::warn!("Health check: banco indisponível ({})", e);
            (StatusCode::SERVICE_UNAVAILABLE, "DB UNAVAILABLE")
        }
    }
}
