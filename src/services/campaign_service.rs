// src/services/campaign_service.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::ReadRetry},
    db::store::{CampaignStore, UserStore},
    models::campaign::{Campaign, CampaignUpdate, DistributionPayload, EffectiveShare, NewCampaign},
    services::distribution,
};

#[derive(Clone)]
pub struct CampaignService {
    campaigns: Arc<dyn CampaignStore>,
    users: Arc<dyn UserStore>,
    retry: ReadRetry,
}

impl CampaignService {
    pub fn new(campaigns: Arc<dyn CampaignStore>, users: Arc<dyn UserStore>, retry: ReadRetry) -> Self {
        Self { campaigns, users, retry }
    }

    // =========================================================================
    //  DISTRIBUIÇÃO
    // =========================================================================

    /// Escolhe o consultor do próximo lead e incrementa o contador dele.
    ///
    /// O incremento é uma escrita atômica única e nunca é repetido: se falhar,
    /// o erro sobe e quem chamou decide. Um lead que não chega a ser gravado
    /// depois do incremento deixa o contador uma unidade à frente.
    pub async fn assign(&self, campaign_id: Uuid) -> Result<Uuid, AppError> {
        let campaign = self.get(campaign_id).await?;
        if !campaign.active {
            return Err(AppError::CampaignInactive);
        }

        let active = self.active_consultant_ids().await?;
        let Some(winner) = distribution::pick_consultant(&campaign, &active) else {
            tracing::warn!("Campanha '{}' sem consultor disponível", campaign.name);
            return Err(AppError::NoAvailableConsultant);
        };

        let updated = self.campaigns.increment_counter(campaign_id, winner).await?;
        tracing::info!(
            "Lead da campanha '{}' atribuído a {} (total {})",
            updated.name,
            winner,
            updated.counter(&winner)
        );
        Ok(winner)
    }

    pub async fn effective_distribution(&self, campaign_id: Uuid) -> Result<Vec<EffectiveShare>, AppError> {
        let campaign = self.get(campaign_id).await?;
        let active = self.active_consultant_ids().await?;
        Ok(distribution::effective_shares(&campaign, &active))
    }

    // =========================================================================
    //  ADMINISTRAÇÃO
    // =========================================================================

    pub async fn list(&self) -> Result<Vec<Campaign>, AppError> {
        self.retry.run("campanhas", || self.campaigns.list_campaigns()).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Campaign, AppError> {
        self.retry
            .run("campanha", || self.campaigns.get_campaign(id))
            .await?
            .ok_or(AppError::CampaignNotFound)
    }

    /// Nova campanha com peso e contador zerados para todos os consultores ativos.
    pub async fn create(&self, payload: NewCampaign) -> Result<Campaign, AppError> {
        let consultants = self.active_consultant_ids().await?;
        let campaign = Campaign {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            source: payload.source.trim().to_string(),
            active: true,
            distribution: consultants.iter().map(|id| (*id, 0)).collect(),
            counters: consultants.iter().map(|id| (*id, 0)).collect(),
            excluded: BTreeSet::new(),
            created_at: Utc::now(),
        };
        self.campaigns.insert_campaign(&campaign).await?;
        tracing::info!("Campanha '{}' criada", campaign.name);
        Ok(campaign)
    }

    pub async fn update(&self, id: Uuid, payload: CampaignUpdate) -> Result<Campaign, AppError> {
        let mut campaign = self.get(id).await?;
        if let Some(name) = payload.name {
            campaign.name = name.trim().to_string();
        }
        if let Some(source) = payload.source {
            campaign.source = source.trim().to_string();
        }
        self.campaigns.update_campaign(&campaign).await?;
        Ok(campaign)
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Campaign, AppError> {
        let mut campaign = self.get(id).await?;
        campaign.active = active;
        self.campaigns.update_campaign(&campaign).await?;
        tracing::info!("Campanha '{}' {}", campaign.name, if active { "ativada" } else { "desativada" });
        Ok(campaign)
    }

    /// Valida e grava a distribuição. Excluídos ficam com peso 0; os demais
    /// precisam somar exatamente 100. Contadores existentes são preservados.
    pub async fn save_distribution(&self, id: Uuid, payload: DistributionPayload) -> Result<Campaign, AppError> {
        let mut campaign = self.get(id).await?;
        let active = self.active_consultant_ids().await?;

        let distribution = validate_distribution(&payload, &active)?;

        campaign.distribution = distribution;
        campaign.excluded = payload.excluded;
        self.campaigns.update_campaign(&campaign).await?;

        tracing::info!(
            "Distribuição da campanha '{}' salva ({} consultores, {} excluídos)",
            campaign.name,
            campaign.distribution.len(),
            campaign.excluded.len()
        );
        Ok(campaign)
    }

    async fn active_consultant_ids(&self) -> Result<BTreeSet<Uuid>, AppError> {
        let consultants = self
            .retry
            .run("consultores ativos", || self.users.list_active_consultants())
            .await?;
        Ok(consultants.into_iter().map(|u| u.id).collect())
    }
}

fn validate_distribution(
    payload: &DistributionPayload,
    active: &BTreeSet<Uuid>,
) -> Result<BTreeMap<Uuid, u32>, AppError> {
    let mut distribution = BTreeMap::new();
    let mut total = 0u32;

    for consultant in payload.distribution.keys().chain(payload.excluded.iter()) {
        if !active.contains(consultant) {
            return Err(AppError::InvalidDistribution(format!("consultor {consultant} não está ativo")));
        }
    }

    for (consultant, weight) in &payload.distribution {
        if *weight > 100 {
            return Err(AppError::InvalidDistribution(format!("peso {weight} acima de 100")));
        }
        let weight = if payload.excluded.contains(consultant) { 0 } else { *weight };
        total += weight;
        distribution.insert(*consultant, weight);
    }
    for consultant in &payload.excluded {
        distribution.entry(*consultant).or_insert(0);
    }

    if total != 100 {
        return Err(AppError::InvalidDistribution(format!("o total é {total}%, deveria ser 100%")));
    }
    Ok(distribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryStore, models::auth::Role};
    use std::time::Duration;

    async fn setup() -> (MemoryStore, CampaignService) {
        let store = MemoryStore::seeded();
        let stores = store.stores();
        let service = CampaignService::new(stores.campaigns, stores.users, ReadRetry::new(Duration::from_millis(1)));
        (store, service)
    }

    fn new_campaign() -> NewCampaign {
        NewCampaign { name: "Promo Primavera".into(), source: "facebook".into() }
    }

    #[tokio::test]
    async fn create_initializes_every_active_consultant() {
        let (store, service) = setup().await;
        let a = store.add_user("Anna Verdi", Role::Consultant).await;
        let b = store.add_user("Bruno Neri", Role::Consultant).await;
        store.add_user("Admin", Role::Admin).await;

        let campaign = service.create(new_campaign()).await.unwrap();
        assert_eq!(campaign.distribution.len(), 2);
        assert_eq!(campaign.distribution[&a.id], 0);
        assert_eq!(campaign.counter(&b.id), 0);
    }

    #[tokio::test]
    async fn distribution_must_sum_to_one_hundred() {
        let (store, service) = setup().await;
        let a = store.add_user("Anna Verdi", Role::Consultant).await;
        let b = store.add_user("Bruno Neri", Role::Consultant).await;
        let campaign = service.create(new_campaign()).await.unwrap();

        let bad = DistributionPayload {
            distribution: [(a.id, 60), (b.id, 30)].into_iter().collect(),
            excluded: BTreeSet::new(),
        };
        let err = service.save_distribution(campaign.id, bad).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidDistribution(_)));

        // o excluído não conta no total e fica gravado com 0
        let good = DistributionPayload {
            distribution: [(a.id, 100), (b.id, 30)].into_iter().collect(),
            excluded: [b.id].into_iter().collect(),
        };
        let saved = service.save_distribution(campaign.id, good).await.unwrap();
        assert_eq!(saved.distribution[&b.id], 0);
        assert!(saved.excluded.contains(&b.id));
    }

    #[tokio::test]
    async fn unknown_consultant_is_rejected() {
        let (store, service) = setup().await;
        let a = store.add_user("Anna Verdi", Role::Consultant).await;
        let campaign = service.create(new_campaign()).await.unwrap();
        let payload = DistributionPayload {
            distribution: [(a.id, 50), (Uuid::new_v4(), 50)].into_iter().collect(),
            excluded: BTreeSet::new(),
        };
        assert!(matches!(
            service.save_distribution(campaign.id, payload).await,
            Err(AppError::InvalidDistribution(_))
        ));
    }

    #[tokio::test]
    async fn assign_increments_winner_counter() {
        let (store, service) = setup().await;
        let a = store.add_user("Anna Verdi", Role::Consultant).await;
        let b = store.add_user("Bruno Neri", Role::Consultant).await;
        let campaign = service.create(new_campaign()).await.unwrap();
        service
            .save_distribution(
                campaign.id,
                DistributionPayload {
                    distribution: [(a.id, 60), (b.id, 40)].into_iter().collect(),
                    excluded: BTreeSet::new(),
                },
            )
            .await
            .unwrap();

        for _ in 0..10 {
            service.assign(campaign.id).await.unwrap();
        }
        let campaign = service.get(campaign.id).await.unwrap();
        assert_eq!(campaign.counter(&a.id), 6);
        assert_eq!(campaign.counter(&b.id), 4);
    }

    #[tokio::test]
    async fn assign_without_consultants_fails_and_leaves_counters() {
        let (store, service) = setup().await;
        let a = store.add_user("Anna Verdi", Role::Consultant).await;
        let campaign = service.create(new_campaign()).await.unwrap();
        service
            .save_distribution(
                campaign.id,
                DistributionPayload {
                    distribution: [(a.id, 100)].into_iter().collect(),
                    excluded: BTreeSet::new(),
                },
            )
            .await
            .unwrap();
        store.deactivate_user(a.id).await;

        assert!(matches!(service.assign(campaign.id).await, Err(AppError::NoAvailableConsultant)));
        assert_eq!(service.get(campaign.id).await.unwrap().counter(&a.id), 0);
    }

    #[tokio::test]
    async fn inactive_campaign_refuses_assignment() {
        let (store, service) = setup().await;
        store.add_user("Anna Verdi", Role::Consultant).await;
        let campaign = service.create(new_campaign()).await.unwrap();
        service.set_active(campaign.id, false).await.unwrap();
        assert!(matches!(service.assign(campaign.id).await, Err(AppError::CampaignInactive)));
    }

    #[tokio::test]
    async fn counters_survive_distribution_changes() {
        let (store, service) = setup().await;
        let a = store.add_user("Anna Verdi", Role::Consultant).await;
        let campaign = service.create(new_campaign()).await.unwrap();
        let only_a = DistributionPayload {
            distribution: [(a.id, 100)].into_iter().collect(),
            excluded: BTreeSet::new(),
        };
        service.save_distribution(campaign.id, only_a.clone()).await.unwrap();
        service.assign(campaign.id).await.unwrap();
        service.save_distribution(campaign.id, only_a).await.unwrap();
        assert_eq!(service.get(campaign.id).await.unwrap().counter(&a.id), 1);
    }
}
