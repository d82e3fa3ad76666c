// src/models/rbac.rs

use std::collections::BTreeSet;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::auth::Role;

/// Ações que a interface pode mostrar ou esconder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewLeads,
    CreateLead,
    EditLead,
    DeleteLead,
    ReassignLead,
    ImportLeads,
    LogActivity,
    ChangeStatus,
    ViewKanban,
    BulkDelete,
    ManageStatuses,
    ManageCampaigns,
    CreateBoRequest,
    HandleBoRequests,
    ManageContracts,
    ViewReports,
    ViewAgenda,
    PublishAnnouncements,
}

impl Action {
    pub const ALL: [Action; 18] = [
        Action::ViewLeads,
        Action::CreateLead,
        Action::EditLead,
        Action::DeleteLead,
        Action::ReassignLead,
        Action::ImportLeads,
        Action::LogActivity,
        Action::ChangeStatus,
        Action::ViewKanban,
        Action::BulkDelete,
        Action::ManageStatuses,
        Action::ManageCampaigns,
        Action::CreateBoRequest,
        Action::HandleBoRequests,
        Action::ManageContracts,
        Action::ViewReports,
        Action::ViewAgenda,
        Action::PublishAnnouncements,
    ];
}

/// Função pura: o que cada perfil pode fazer. Escopo por dono fica nos serviços.
pub fn visible_actions(role: Role) -> BTreeSet<Action> {
    use Action::*;
    match role {
        Role::Admin => Action::ALL.into_iter().collect(),
        Role::Consultant => [
            ViewLeads,
            CreateLead,
            EditLead,
            LogActivity,
            ChangeStatus,
            ViewKanban,
            CreateBoRequest,
            ManageContracts,
            ViewReports,
            ViewAgenda,
        ]
        .into_iter()
        .collect(),
        Role::BackOffice => [
            ViewLeads,
            CreateLead,
            LogActivity,
            ChangeStatus,
            ViewKanban,
            HandleBoRequests,
            ManageContracts,
            ViewReports,
            ViewAgenda,
            PublishAnnouncements,
        ]
        .into_iter()
        .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_sees_everything() {
        assert_eq!(visible_actions(Role::Admin).len(), Action::ALL.len());
    }

    #[test]
    fn consultant_cannot_administer_pipeline() {
        let actions = visible_actions(Role::Consultant);
        assert!(actions.contains(&Action::CreateBoRequest));
        assert!(!actions.contains(&Action::ManageStatuses));
        assert!(!actions.contains(&Action::BulkDelete));
        assert!(!actions.contains(&Action::HandleBoRequests));
        assert!(actions.contains(&Action::ViewAgenda));
        assert!(!actions.contains(&Action::PublishAnnouncements));
    }

    #[test]
    fn back_office_handles_requests_but_not_campaigns() {
        let actions = visible_actions(Role::BackOffice);
        assert!(actions.contains(&Action::HandleBoRequests));
        assert!(!actions.contains(&Action::ManageCampaigns));
        assert!(!actions.contains(&Action::CreateBoRequest));
        assert!(actions.contains(&Action::PublishAnnouncements));
    }
}
