// src/kanban/board.rs

use std::collections::BTreeSet;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::Actor,
        lead::{BulkDeleteFailure, BulkDeleteReport, Lead, LeadQuery},
        pipeline::{Phase, Status},
    },
    services::{LeadService, PipelineService, TransitionOptions},
};

/// Estado da sobreposição da UI:
/// `Idle -> Dragging -> Idle` (gravado ou revertido) e
/// `Idle -> Selecting -> BulkDeleting -> Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum BoardMode {
    Idle,
    Dragging {
        #[serde(rename = "leadId")]
        lead_id: Uuid,
        from: String,
    },
    Selecting,
    BulkDeleting,
}

/// O que aconteceu ao soltar um card.
#[derive(Debug)]
pub enum DropOutcome {
    /// Solto na coluna de origem (ou sem arraste em curso).
    NoOp,
    Committed(Lead),
    /// Transição fora das recomendadas: o card voltou e a UI deve perguntar.
    NeedsConfirmation {
        from: String,
        to: String,
        recommended: Vec<String>,
    },
    /// Falhou ao gravar: o card voltou e o quadro foi recarregado.
    Reverted { error: AppError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardClick {
    /// Fora do modo seleção o clique abre a ficha do lead.
    Open(Uuid),
    Toggled { lead_id: Uuid, selected: bool },
    Ignored,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub status_id: String,
    pub name: String,
    pub color: String,
    pub phase: Phase,
    pub count: usize,
    pub leads: Vec<Lead>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub columns: Vec<BoardColumn>,
    pub mode: BoardMode,
    pub selected: Vec<Uuid>,
}

/// Controlador do quadro. Guarda a visão local (otimista) e a mantém
/// coerente com o que foi gravado.
pub struct KanbanBoard {
    leads: LeadService,
    pipeline: PipelineService,
    actor: Actor,
    query: LeadQuery,
    columns: Vec<Status>,
    cards: Vec<Lead>,
    mode: BoardMode,
    selection: BTreeSet<Uuid>,
}

impl KanbanBoard {
    pub async fn load(
        leads: LeadService,
        pipeline: PipelineService,
        actor: Actor,
        query: LeadQuery,
    ) -> Result<Self, AppError> {
        let mut board = Self {
            leads,
            pipeline,
            actor,
            query,
            columns: Vec::new(),
            cards: Vec::new(),
            mode: BoardMode::Idle,
            selection: BTreeSet::new(),
        };
        board.refresh().await?;
        Ok(board)
    }

    /// Recarrega colunas e cards do armazenamento.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let columns = self.pipeline.active_statuses().await?;
        let cards = self.leads.list(&self.query, &self.actor).await?;
        self.columns = columns;
        self.cards = cards;
        self.selection.retain(|id| self.cards.iter().any(|c| c.id == *id));
        Ok(())
    }

    pub fn mode(&self) -> &BoardMode {
        &self.mode
    }

    pub fn card(&self, lead_id: Uuid) -> Option<&Lead> {
        self.cards.iter().find(|c| c.id == lead_id)
    }

    pub fn column_count(&self, status_id: &str) -> usize {
        self.cards.iter().filter(|c| c.status_id == status_id).count()
    }

    // =========================================================================
    //  ARRASTAR E SOLTAR
    // =========================================================================

    /// Começa a arrastar. Só a partir do modo ocioso e com o card no quadro.
    pub fn start_drag(&mut self, lead_id: Uuid) -> bool {
        if self.mode != BoardMode::Idle {
            return false;
        }
        let Some(card) = self.card(lead_id) else {
            return false;
        };
        self.mode = BoardMode::Dragging { lead_id, from: card.status_id.clone() };
        true
    }

    pub fn cancel_drag(&mut self) {
        if matches!(self.mode, BoardMode::Dragging { .. }) {
            self.mode = BoardMode::Idle;
        }
    }

    /// Solta o card em `to`. O card muda de coluna na hora; se a gravação
    /// falhar ele volta e o quadro é recarregado.
    pub async fn drop_on(&mut self, to: &str, force: bool) -> DropOutcome {
        let BoardMode::Dragging { lead_id, from } = std::mem::replace(&mut self.mode, BoardMode::Idle) else {
            return DropOutcome::NoOp;
        };
        if from == to {
            return DropOutcome::NoOp;
        }
        let Some(index) = self.cards.iter().position(|c| c.id == lead_id) else {
            return DropOutcome::Reverted { error: AppError::LeadNotFound };
        };

        let original = self.cards[index].clone();
        if let Some(target) = self.columns.iter().find(|s| s.id == to) {
            let card = &mut self.cards[index];
            card.status_id = target.id.clone();
            card.phase = target.phase;
        }

        let options = TransitionOptions { force, note: None };
        match self.leads.change_status(lead_id, to, options, &self.actor).await {
            Ok(updated) => {
                self.cards[index] = updated.clone();
                DropOutcome::Committed(updated)
            }
            Err(AppError::TransitionRejectedAdvisory { from, to, recommended }) => {
                self.cards[index] = original;
                DropOutcome::NeedsConfirmation { from, to, recommended }
            }
            Err(AppError::TransitionNoop(_)) => {
                self.cards[index] = original;
                DropOutcome::NoOp
            }
            Err(error) => {
                self.cards[index] = original;
                tracing::warn!("Movimento do lead {} revertido: {}", lead_id, error);
                if let Err(e) = self.refresh().await {
                    tracing::warn!("Não foi possível recarregar o quadro: {}", e);
                }
                DropOutcome::Reverted { error }
            }
        }
    }

    /// Arrasta e solta de uma vez (usado pela API e após a confirmação).
    pub async fn move_card(&mut self, lead_id: Uuid, to: &str, force: bool) -> DropOutcome {
        if !self.start_drag(lead_id) {
            return DropOutcome::Reverted { error: AppError::LeadNotFound };
        }
        self.drop_on(to, force).await
    }

    // =========================================================================
    //  SELEÇÃO E REMOÇÃO EM LOTE
    // =========================================================================

    pub fn toggle_selection_mode(&mut self) -> &BoardMode {
        self.mode = match self.mode {
            BoardMode::Idle => BoardMode::Selecting,
            BoardMode::Selecting => BoardMode::Idle,
            ref other => other.clone(),
        };
        self.selection.clear();
        &self.mode
    }

    pub fn click_card(&mut self, lead_id: Uuid) -> CardClick {
        if self.card(lead_id).is_none() {
            return CardClick::Ignored;
        }
        match self.mode {
            BoardMode::Idle => CardClick::Open(lead_id),
            BoardMode::Selecting => {
                let selected = if self.selection.remove(&lead_id) {
                    false
                } else {
                    self.selection.insert(lead_id);
                    true
                };
                CardClick::Toggled { lead_id, selected }
            }
            _ => CardClick::Ignored,
        }
    }

    pub fn selected(&self) -> Vec<Uuid> {
        self.selection.iter().copied().collect()
    }

    /// Quantos cards a única confirmação vai cobrir; `None` se não há o que remover.
    pub fn bulk_delete_prompt(&self) -> Option<usize> {
        (self.mode == BoardMode::Selecting && !self.selection.is_empty()).then_some(self.selection.len())
    }

    /// Remove os selecionados um a um. Os que saíram somem do quadro; os que
    /// falharam continuam lá e aparecem no relatório.
    pub async fn confirm_bulk_delete(&mut self) -> Result<BulkDeleteReport, AppError> {
        if self.bulk_delete_prompt().is_none() {
            return Ok(BulkDeleteReport::default());
        }
        self.mode = BoardMode::BulkDeleting;
        let ids = self.selected();

        let result = self.leads.bulk_delete(&ids, &self.actor).await;
        match result {
            Ok(report) => {
                self.cards.retain(|c| !report.deleted.contains(&c.id));
                self.selection.clear();
                self.mode = BoardMode::Idle;
                Ok(report)
            }
            Err(e) => {
                self.mode = BoardMode::Selecting;
                Err(e)
            }
        }
    }

    /// Seleciona `ids` e remove com uma única confirmação. Ids que não estão
    /// no quadro (removidos ou fora do escopo do ator) voltam como falha.
    pub async fn bulk_delete(&mut self, ids: &[Uuid]) -> Result<BulkDeleteReport, AppError> {
        if self.mode == BoardMode::Idle {
            self.toggle_selection_mode();
        }

        let mut missing = Vec::new();
        for id in ids.iter().copied().collect::<BTreeSet<Uuid>>() {
            if !matches!(self.click_card(id), CardClick::Toggled { selected: true, .. }) {
                tracing::warn!("Card {} não está no quadro, contado como falha na remoção em lote", id);
                missing.push(BulkDeleteFailure { id, reason: AppError::LeadNotFound.to_string() });
            }
        }

        let mut report = self.confirm_bulk_delete().await?;
        if self.mode == BoardMode::Selecting {
            // nada válido para confirmar
            self.toggle_selection_mode();
        }
        report.failed.extend(missing);
        Ok(report)
    }

    // =========================================================================
    //  VISÃO
    // =========================================================================

    pub fn snapshot(&self) -> BoardView {
        let columns = self
            .columns
            .iter()
            .map(|status| {
                let leads: Vec<Lead> = self.cards.iter().filter(|c| c.status_id == status.id).cloned().collect();
                BoardColumn {
                    status_id: status.id.clone(),
                    name: status.name.clone(),
                    color: status.color.clone(),
                    phase: status.phase,
                    count: leads.len(),
                    leads,
                }
            })
            .collect();
        BoardView { columns, mode: self.mode.clone(), selected: self.selected() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::retry::ReadRetry,
        db::{store::Stores, MemoryStore},
        models::{auth::Role, lead::NewLead, pipeline::StatusUpdate},
        services::{CampaignService, TimelineService},
    };
    use std::time::Duration;

    struct Fixture {
        store: MemoryStore,
        stores: Stores,
        leads: LeadService,
        pipeline: PipelineService,
        admin: Actor,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::seeded();
        let stores = store.stores();
        let retry = ReadRetry::new(Duration::from_millis(1));
        let pipeline = PipelineService::new(stores.statuses.clone(), stores.leads.clone(), retry, "nuovo");
        let leads = LeadService::new(
            stores.leads.clone(),
            stores.users.clone(),
            pipeline.clone(),
            CampaignService::new(stores.campaigns.clone(), stores.users.clone(), retry),
            TimelineService::new(stores.timeline.clone(), retry),
            retry,
        );
        let admin = store.add_user("Admin", Role::Admin).await.as_actor();
        Fixture { store, stores, leads, pipeline, admin }
    }

    async fn board(f: &Fixture) -> KanbanBoard {
        KanbanBoard::load(f.leads.clone(), f.pipeline.clone(), f.admin.clone(), LeadQuery::default())
            .await
            .unwrap()
    }

    async fn lead(f: &Fixture, name: &str) -> Lead {
        f.leads
            .create(NewLead { first_name: name.into(), ..Default::default() }, &f.admin)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn one_column_per_active_status() {
        let f = fixture().await;
        f.pipeline.set_active("perso", false).await.unwrap();
        lead(&f, "Luca").await;
        let view = board(&f).await.snapshot();
        assert_eq!(view.columns.len(), 10);
        assert_eq!(view.columns[0].status_id, "nuovo");
        assert_eq!(view.columns[0].count, 1);
    }

    #[tokio::test]
    async fn drop_commits_and_updates_counts() {
        let f = fixture().await;
        let l = lead(&f, "Luca").await;
        let mut board = board(&f).await;

        assert!(board.start_drag(l.id));
        match board.drop_on("contattato", false).await {
            DropOutcome::Committed(updated) => assert_eq!(updated.status_id, "contattato"),
            other => panic!("esperado Committed, veio {other:?}"),
        }
        assert_eq!(board.column_count("nuovo"), 0);
        assert_eq!(board.column_count("contattato"), 1);
        assert_eq!(board.mode(), &BoardMode::Idle);
    }

    #[tokio::test]
    async fn drop_on_origin_is_noop() {
        let f = fixture().await;
        let l = lead(&f, "Luca").await;
        let mut board = board(&f).await;
        board.start_drag(l.id);
        assert!(matches!(board.drop_on("nuovo", false).await, DropOutcome::NoOp));
        assert_eq!(board.column_count("nuovo"), 1);
    }

    #[tokio::test]
    async fn advisory_rejection_asks_for_confirmation() {
        let f = fixture().await;
        f.pipeline
            .update_status(
                "nuovo",
                StatusUpdate { allowed_transitions: Some(vec!["contattato".into()]), ..Default::default() },
            )
            .await
            .unwrap();
        let l = lead(&f, "Luca").await;
        let mut board = board(&f).await;

        assert!(matches!(
            board.move_card(l.id, "perso", false).await,
            DropOutcome::NeedsConfirmation { ref recommended, .. } if recommended == &vec!["contattato".to_string()]
        ));
        assert_eq!(board.column_count("nuovo"), 1);

        assert!(matches!(board.move_card(l.id, "perso", true).await, DropOutcome::Committed(_)));
        assert_eq!(board.column_count("perso"), 1);
    }

    #[tokio::test]
    async fn failed_drop_is_reverted() {
        let f = fixture().await;
        let l = lead(&f, "Luca").await;
        let mut board = board(&f).await;

        f.store.set_unavailable(true);
        let outcome = board.move_card(l.id, "contattato", false).await;
        assert!(matches!(outcome, DropOutcome::Reverted { error: AppError::PersistenceUnavailable }));
        assert_eq!(board.column_count("nuovo"), 1);
        assert_eq!(board.column_count("contattato"), 0);
        f.store.set_unavailable(false);

        let stored = f.stores.leads.get_lead(l.id).await.unwrap().unwrap();
        assert_eq!(stored.status_id, "nuovo");
    }

    #[tokio::test]
    async fn cancelled_drag_leaves_board_untouched() {
        let f = fixture().await;
        let l = lead(&f, "Luca").await;
        let mut board = board(&f).await;

        assert!(board.start_drag(l.id));
        assert!(!board.start_drag(l.id));
        board.cancel_drag();
        assert_eq!(board.mode(), &BoardMode::Idle);
        assert!(matches!(board.drop_on("contattato", false).await, DropOutcome::NoOp));
        assert_eq!(board.column_count("nuovo"), 1);
    }

    #[tokio::test]
    async fn clicks_select_only_in_selection_mode() {
        let f = fixture().await;
        let l = lead(&f, "Luca").await;
        let mut board = board(&f).await;

        assert_eq!(board.click_card(l.id), CardClick::Open(l.id));
        board.toggle_selection_mode();
        assert_eq!(board.click_card(l.id), CardClick::Toggled { lead_id: l.id, selected: true });
        assert_eq!(board.click_card(l.id), CardClick::Toggled { lead_id: l.id, selected: false });
        assert!(!board.start_drag(l.id));
    }

    #[tokio::test]
    async fn bulk_delete_reports_partial_failure() {
        let f = fixture().await;
        let a = lead(&f, "Luca").await;
        let b = lead(&f, "Sara").await;
        let c = lead(&f, "Paolo").await;
        let mut board = board(&f).await;

        board.toggle_selection_mode();
        for id in [a.id, b.id, c.id] {
            board.click_card(id);
        }
        assert_eq!(board.bulk_delete_prompt(), Some(3));

        // removido por outra sessão depois que o quadro carregou
        f.stores.leads.delete_cascade(b.id).await.unwrap();

        let report = board.confirm_bulk_delete().await.unwrap();
        assert_eq!(report.deleted.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, b.id);
        assert_eq!(board.mode(), &BoardMode::Idle);
        assert!(board.card(a.id).is_none());
        assert!(board.card(c.id).is_none());
    }
    #[tokio::test]
    async fn bulk_delete_by_ids_reports_unknown_ones() {
        let f = fixture().await;
        let a = lead(&f, "Luca").await;
        let ghost = Uuid::new_v4();
        let mut board = board(&f).await;

        let report = board.bulk_delete(&[a.id, ghost, a.id]).await.unwrap();
        assert_eq!(report.deleted, vec![a.id]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, ghost);
        assert_eq!(board.mode(), &BoardMode::Idle);
        assert!(board.card(a.id).is_none());
    }

    #[tokio::test]
    async fn bulk_delete_with_only_unknown_ids_fails_them_all() {
        let f = fixture().await;
        lead(&f, "Luca").await;
        let ghosts = [Uuid::new_v4(), Uuid::new_v4()];
        let mut board = board(&f).await;

        let report = board.bulk_delete(&ghosts).await.unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert_eq!(board.mode(), &BoardMode::Idle);
        assert_eq!(board.column_count("nuovo"), 1);
    }
}
