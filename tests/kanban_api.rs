// tests/kanban_api.rs

use std::marker::PhantomData;

use axum::{
    body::to_bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crm_pipeline::{
    config::{AppState, Settings},
    db::MemoryStore,
    handlers::kanban::bulk_delete_cards,
    middleware::{auth::CurrentActor, i18n::Locale, rbac::RequireAction},
    models::{
        auth::{Actor, Role},
        lead::{BulkDeletePayload, NewLead},
    },
};

async fn setup() -> (AppState, Actor) {
    let store = MemoryStore::seeded();
    let admin = store.add_user("Anna Ferri", Role::Admin).await.as_actor();
    let state = AppState::from_stores(store.stores(), &Settings::for_memory("segredo")).unwrap();
    (state, admin)
}

async fn call_bulk_delete(state: &AppState, actor: &Actor, ids: Vec<Uuid>) -> (StatusCode, Value) {
    let response = bulk_delete_cards(
        State(state.clone()),
        Locale("it".into()),
        CurrentActor(actor.clone()),
        RequireAction(PhantomData),
        Json(BulkDeletePayload { ids }),
    )
    .await
    .into_response();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn bulk_delete_endpoint_reports_unknown_ids_as_failures() {
    let (state, admin) = setup().await;
    let lead = state
        .lead_service
        .create(NewLead { first_name: "Elena".into(), last_name: "Conti".into(), ..Default::default() }, &admin)
        .await
        .unwrap();
    let ghost = Uuid::new_v4();

    let (status, body) = call_bulk_delete(&state, &admin, vec![lead.id, ghost]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"].as_array().unwrap().len(), 1);
    assert_eq!(body["deleted"][0], lead.id.to_string());
    let failed = body["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["id"], ghost.to_string());
    assert!(!failed[0]["reason"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn bulk_delete_endpoint_with_only_unknown_ids() {
    let (state, admin) = setup().await;
    let ghosts = vec![Uuid::new_v4(), Uuid::new_v4()];

    let (status, body) = call_bulk_delete(&state, &admin, ghosts).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["deleted"].as_array().unwrap().is_empty());
    assert_eq!(body["failed"].as_array().unwrap().len(), 2);
}
