//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

use crm_pipeline::{
    config::{AppState, Settings},
    docs::ApiDoc,
    handlers,
    middleware::auth::auth_guard,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    let lead_routes = Router::new()
        .route("/"
               ,get(handlers::leads::list_leads)
               .post(handlers::leads::create_lead)
        )
        .route("/bulk-delete", post(handlers::leads::bulk_delete_leads))
        .route("/ingest", post(handlers::leads::ingest_lead))
        .route("/import", post(handlers::leads::import_leads))
        .route("/{id}"
               ,get(handlers::leads::get_lead)
               .patch(handlers::leads::update_lead)
               .delete(handlers::leads::delete_lead)
        )
        .route("/{id}/status", post(handlers::leads::change_lead_status))
        .route("/{id}/reassign", post(handlers::leads::reassign_lead))
        .route("/{id}/notes", post(handlers::leads::add_note))
        .route("/{id}/calls", post(handlers::leads::log_call))
        .route("/{id}/documents"
               ,get(handlers::leads::list_documents)
               .post(handlers::leads::attach_document)
        )
        .route("/{id}/timeline", get(handlers::leads::lead_timeline))
        .route("/{id}/contract"
               ,get(handlers::contracts::get_contract)
               .put(handlers::contracts::save_contract)
        )
        .route("/{id}/bo-requests"
               ,get(handlers::backoffice::list_lead_requests)
               .post(handlers::backoffice::create_request)
        );

    let status_routes = Router::new()
        .route("/"
               ,get(handlers::statuses::list_statuses)
               .post(handlers::statuses::create_status)
        )
        .route("/order", put(handlers::statuses::reorder_statuses))
        .route("/check", get(handlers::statuses::check_transition))
        .route("/{id}"
               ,patch(handlers::statuses::update_status)
               .delete(handlers::statuses::delete_status)
        )
        .route("/{id}/active", post(handlers::statuses::set_status_active));

    let campaign_routes = Router::new()
        .route("/"
               ,get(handlers::campaigns::list_campaigns)
               .post(handlers::campaigns::create_campaign)
        )
        .route("/{id}", patch(handlers::campaigns::update_campaign))
        .route("/{id}/active", post(handlers::campaigns::set_campaign_active))
        .route("/{id}/distribution", put(handlers::campaigns::save_distribution))
        .route("/{id}/effective-distribution", get(handlers::campaigns::effective_distribution));

    let kanban_routes = Router::new()
        .route("/", get(handlers::kanban::get_board))
        .route("/moves", post(handlers::kanban::move_card))
        .route("/bulk-delete", post(handlers::kanban::bulk_delete_cards));

    let backoffice_routes = Router::new()
        .route("/pending", get(handlers::backoffice::pending_requests))
        .route("/unread-count", get(handlers::backoffice::unread_count))
        .route("/{id}/claim", post(handlers::backoffice::claim_request))
        .route("/{id}/respond", post(handlers::backoffice::respond_request))
        .route("/{id}/read", post(handlers::backoffice::mark_request_read));

    let agenda_routes = Router::new()
        .route("/"
               ,get(handlers::agenda::list_appointments)
               .post(handlers::agenda::create_appointment)
        )
        .route("/{id}"
               ,put(handlers::agenda::update_appointment)
               .delete(handlers::agenda::delete_appointment)
        )
        .route("/{id}/completed", post(handlers::agenda::set_appointment_completed));

    let announcement_routes = Router::new()
        .route("/"
               ,get(handlers::announcements::list_announcements)
               .post(handlers::announcements::publish_announcement)
        )
        .route("/unread-count", get(handlers::announcements::unread_announcements))
        .route("/{id}/read", post(handlers::announcements::mark_announcement_read));

    let report_routes = Router::new()
        .route("/activity", get(handlers::reports::activity_report))
        .route("/pipeline", get(handlers::reports::pipeline_report));

    // Tudo abaixo exige o Bearer do serviço de identidade
    let protected = Router::new()
        .nest("/leads", lead_routes)
        .nest("/statuses", status_routes)
        .nest("/campaigns", campaign_routes)
        .nest("/kanban", kanban_routes)
        .nest("/bo-requests", backoffice_routes)
        .nest("/appointments", agenda_routes)
        .nest("/announcements", announcement_routes)
        .nest("/reports", report_routes)
        .route("/me/actions", get(handlers::me::my_actions))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api", protected)
        .with_state(app_state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
