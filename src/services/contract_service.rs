// src/services/contract_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, retry::ReadRetry},
    db::store::ContractStore,
    models::{
        auth::Actor,
        contract::{Contract, ContractTerms},
    },
    services::{
        lead_service::LeadService,
        pipeline_service::{PipelineService, TransitionOptions},
    },
};

#[derive(Clone)]
pub struct ContractService {
    contracts: Arc<dyn ContractStore>,
    leads: LeadService,
    pipeline: PipelineService,
    retry: ReadRetry,
    sold_status_id: String,
}

impl ContractService {
    pub fn new(
        contracts: Arc<dyn ContractStore>,
        leads: LeadService,
        pipeline: PipelineService,
        retry: ReadRetry,
        sold_status_id: impl Into<String>,
    ) -> Self {
        Self { contracts, leads, pipeline, retry, sold_status_id: sold_status_id.into() }
    }

    pub async fn get(&self, lead_id: Uuid, actor: &Actor) -> Result<Contract, AppError> {
        self.leads.get(lead_id, actor).await?;
        self.retry
            .run("contrato", || self.contracts.find_by_lead(lead_id))
            .await?
            .ok_or(AppError::ContractNotFound)
    }

    /// Primeira gravação cria o contrato e fecha o lead como vendido.
    /// As seguintes atualizam os termos e, se o lead ainda não estiver no
    /// status de venda (gravação anterior interrompida), fecham o lead.
    pub async fn save(&self, lead_id: Uuid, terms: ContractTerms, actor: &Actor) -> Result<Contract, AppError> {
        terms.validate()?;
        let lead = self.leads.get(lead_id, actor).await?;

        // O destino precisa aceitar o lead antes de qualquer escrita
        let needs_closing = lead.status_id != self.sold_status_id;
        if needs_closing {
            let sold = self.pipeline.get_status(&self.sold_status_id).await?;
            if !sold.active {
                return Err(AppError::StatusInactive(sold.id));
            }
        }

        let existing = self.retry.run("contrato", || self.contracts.find_by_lead(lead_id)).await?;

        let (contract, note) = match existing {
            Some(mut contract) => {
                contract.apply_terms(terms);
                contract.updated_at = Utc::now();
                self.contracts.update_contract(&contract).await?;
                let note = format!("Contratto aggiornato: {}", summary(&contract));
                tracing::info!("Contrato do lead {} atualizado", lead.id);
                (contract, note)
            }
            None => {
                let now = Utc::now();
                let mut contract = Contract {
                    id: Uuid::new_v4(),
                    lead_id: lead.id,
                    consultant_id: lead.consultant_id,
                    brand: String::new(),
                    model: String::new(),
                    trim_level: None,
                    monthly_payment: Default::default(),
                    term_months: 0,
                    annual_km: None,
                    down_payment: None,
                    commission: None,
                    provider: None,
                    contract_number: None,
                    notes: None,
                    signed_on: now.date_naive(),
                    expected_delivery: None,
                    delivered_on: None,
                    created_by: actor.id,
                    created_at: now,
                    updated_at: now,
                };
                contract.apply_terms(terms);
                self.contracts.insert_contract(&contract).await?;
                let note = format!("Contratto firmato: {}", summary(&contract));
                tracing::info!("Contrato {} criado para o lead {} por {}", contract.id, lead.id, actor.display_name);
                (contract, note)
            }
        };

        if needs_closing {
            self.pipeline
                .transition(&lead, &self.sold_status_id, actor, TransitionOptions::forced().with_note(note))
                .await?;
        } else {
            self.leads.add_note(lead.id, &note, actor).await?;
        }
        Ok(contract)
    }
}

fn summary(contract: &Contract) -> String {
    format!(
        "{} {} a {} €/mese per {} mesi",
        contract.brand, contract.model, contract.monthly_payment, contract.term_months
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{store::Stores, MemoryStore},
        models::{
            auth::Role,
            lead::NewLead,
            pipeline::Phase,
            timeline::{TimeRange, TimelineKind},
        },
        services::{campaign_service::CampaignService, timeline_service::TimelineService},
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::time::Duration;

    async fn setup() -> (ContractService, LeadService, Actor) {
        let (service, leads, consultant, _, _) = setup_with_stores().await;
        (service, leads, consultant)
    }

    async fn setup_with_stores() -> (ContractService, LeadService, Actor, PipelineService, Stores) {
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
        let service = ContractService::new(stores.contracts.clone(), leads.clone(), pipeline.clone(), retry, "venduto");
        let consultant = store.add_user("Anna Verdi", Role::Consultant).await.as_actor();
        (service, leads, consultant, pipeline, stores)
    }

    fn terms(payment: i64) -> ContractTerms {
        ContractTerms {
            brand: "Fiat".into(),
            model: "500e".into(),
            trim_level: Some("La Prima".into()),
            monthly_payment: Decimal::new(payment, 2),
            term_months: 36,
            annual_km: Some(15_000),
            down_payment: None,
            commission: Some(Decimal::new(45000, 2)),
            provider: Some("Arval".into()),
            contract_number: None,
            notes: None,
            signed_on: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            expected_delivery: None,
            delivered_on: None,
        }
    }

    #[tokio::test]
    async fn first_save_marks_lead_as_sold() {
        let (service, leads, consultant) = setup().await;
        let lead = leads
            .create(NewLead { first_name: "Luca".into(), ..Default::default() }, &consultant)
            .await
            .unwrap();

        let contract = service.save(lead.id, terms(34990), &consultant).await.unwrap();
        assert_eq!(contract.consultant_id, Some(consultant.id));
        assert_eq!(contract.monthly_payment, Decimal::new(34990, 2));

        let sold = leads.get(lead.id, &consultant).await.unwrap();
        assert_eq!(sold.status_id, "venduto");
        assert_eq!(sold.phase, Phase::Closing);
        assert!(sold.closed_at.is_some());

        let timeline = leads.timeline(lead.id, &TimeRange::default(), &consultant).await.unwrap();
        assert_eq!(timeline[0].kind, TimelineKind::StatusChange);
        assert!(timeline[0].note.contains("Fiat 500e"));
    }

    #[tokio::test]
    async fn later_saves_only_update_terms() {
        let (service, leads, consultant) = setup().await;
        let lead = leads
            .create(NewLead { first_name: "Luca".into(), ..Default::default() }, &consultant)
            .await
            .unwrap();
        let first = service.save(lead.id, terms(34990), &consultant).await.unwrap();
        let second = service.save(lead.id, terms(31990), &consultant).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(service.get(lead.id, &consultant).await.unwrap().monthly_payment, Decimal::new(31990, 2));

        let timeline = leads.timeline(lead.id, &TimeRange::default(), &consultant).await.unwrap();
        let transitions = timeline.iter().filter(|e| e.kind == TimelineKind::StatusChange).count();
        // criação + venda
        assert_eq!(transitions, 2);
        assert_eq!(timeline[0].kind, TimelineKind::Note);
    }

    #[tokio::test]
    async fn missing_contract_is_not_found() {
        let (service, leads, consultant) = setup().await;
        let lead = leads
            .create(NewLead { first_name: "Luca".into(), ..Default::default() }, &consultant)
            .await
            .unwrap();
        assert!(matches!(service.get(lead.id, &consultant).await, Err(AppError::ContractNotFound)));
    }

    #[tokio::test]
    async fn inactive_sold_status_stores_nothing() {
        let (service, leads, consultant, pipeline, stores) = setup_with_stores().await;
        let lead = leads
            .create(NewLead { first_name: "Luca".into(), ..Default::default() }, &consultant)
            .await
            .unwrap();

        pipeline.set_active("venduto", false).await.unwrap();
        let err = service.save(lead.id, terms(34990), &consultant).await.unwrap_err();
        assert!(matches!(err, AppError::StatusInactive(ref id) if id == "venduto"));
        assert!(stores.contracts.find_by_lead(lead.id).await.unwrap().is_none());

        pipeline.set_active("venduto", true).await.unwrap();
        service.save(lead.id, terms(34990), &consultant).await.unwrap();
        let sold = leads.get(lead.id, &consultant).await.unwrap();
        assert_eq!(sold.status_id, "venduto");
        assert!(sold.closed_at.is_some());
    }

    #[tokio::test]
    async fn update_closes_a_lead_left_open() {
        let (service, leads, consultant, _, stores) = setup_with_stores().await;
        let lead = leads
            .create(NewLead { first_name: "Luca".into(), ..Default::default() }, &consultant)
            .await
            .unwrap();
        let first = service.save(lead.id, terms(34990), &consultant).await.unwrap();

        // contrato gravado, mas o lead voltou a um status aberto
        let lead = leads.get(lead.id, &consultant).await.unwrap();
        leads
            .change_status(lead.id, "trattativa", TransitionOptions::forced(), &consultant)
            .await
            .unwrap();
        assert!(stores.contracts.find_by_lead(lead.id).await.unwrap().is_some());

        let second = service.save(lead.id, terms(31990), &consultant).await.unwrap();
        assert_eq!(first.id, second.id);
        let sold = leads.get(lead.id, &consultant).await.unwrap();
        assert_eq!(sold.status_id, "venduto");

        let timeline = leads.timeline(lead.id, &TimeRange::default(), &consultant).await.unwrap();
        assert_eq!(timeline[0].kind, TimelineKind::StatusChange);
        assert!(timeline[0].note.starts_with("Contratto aggiornato"));
    }

    #[tokio::test]
    async fn negative_amounts_are_rejected() {
        let (service, leads, consultant) = setup().await;
        let lead = leads
            .create(NewLead { first_name: "Luca".into(), ..Default::default() }, &consultant)
            .await
            .unwrap();

        let err = service.save(lead.id, terms(-100), &consultant).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref e) if e.field_errors().contains_key("monthly_payment")));

        let mut bad_commission = terms(34990);
        bad_commission.commission = Some(Decimal::new(-1, 0));
        assert!(bad_commission.validate().is_err());

        let mut zero_down = terms(34990);
        zero_down.down_payment = Some(Decimal::ZERO);
        assert!(zero_down.validate().is_ok());
        assert!(matches!(service.get(lead.id, &consultant).await, Err(AppError::ContractNotFound)));
    }
}
