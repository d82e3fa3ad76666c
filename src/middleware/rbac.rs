// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::{
        auth::Actor,
        rbac::{visible_actions, Action},
    },
};

/// 1. O Trait que liga um tipo a uma ação
pub trait ActionDef: Send + Sync + 'static {
    const ACTION: Action;
}

/// 2. O Extractor (Guardião): o perfil do ator precisa incluir a ação
pub struct RequireAction<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireAction<T>
where
    T: ActionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts.extensions.get::<Actor>().ok_or(AppError::InvalidToken)?;

        if !visible_actions(actor.role).contains(&T::ACTION) {
            tracing::warn!("{} ({:?}) sem permissão para {:?}", actor.display_name, actor.role, T::ACTION);
            return Err(AppError::Forbidden);
        }

        Ok(RequireAction(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS AÇÕES (TIPOS)
// ---

macro_rules! action_types {
    ($($name:ident => $action:ident),* $(,)?) => {
        $(
            pub struct $name;
            impl ActionDef for $name {
                const ACTION: Action = Action::$action;
            }
        )*
    };
}

action_types! {
    CanViewLeads => ViewLeads,
    CanCreateLead => CreateLead,
    CanEditLead => EditLead,
    CanDeleteLead => DeleteLead,
    CanReassignLead => ReassignLead,
    CanImportLeads => ImportLeads,
    CanLogActivity => LogActivity,
    CanChangeStatus => ChangeStatus,
    CanViewKanban => ViewKanban,
    CanBulkDelete => BulkDelete,
    CanManageStatuses => ManageStatuses,
    CanManageCampaigns => ManageCampaigns,
    CanCreateBoRequest => CreateBoRequest,
    CanHandleBoRequests => HandleBoRequests,
    CanManageContracts => ManageContracts,
    CanViewReports => ViewReports,
    CanViewAgenda => ViewAgenda,
    CanPublishAnnouncements => PublishAnnouncements,
}
