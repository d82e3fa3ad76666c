// src/handlers/me.rs

use std::collections::BTreeSet;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    middleware::auth::CurrentActor,
    models::{
        auth::Actor,
        rbac::{visible_actions, Action},
    },
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyActions {
    pub actor: Actor,
    #[schema(value_type = Vec<Action>)]
    pub actions: BTreeSet<Action>,
}

// GET /api/me/actions
#[utoipa::path(
    get,
    path = "/api/me/actions",
    tag = "Usuário",
    responses(
        (status = 200, description = "Ações que a interface deve mostrar para o perfil", body = MyActions)
    ),
    security(("api_jwt" = []))
)]
pub async fn my_actions(CurrentActor(actor): CurrentActor) -> impl IntoResponse {
    let actions = visible_actions(actor.role);
    (StatusCode::OK, Json(MyActions { actor, actions }))
}
