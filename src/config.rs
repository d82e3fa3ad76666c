// src/config.rs

use std::{env, str::FromStr, time::Duration};

use anyhow::{bail, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{i18n::I18nStore, retry::ReadRetry},
    db::{MemoryStore, Stores},
    services::{
        auth::AuthService, AgendaService, AnnouncementService, BackOfficeService, CampaignService, ContractService,
        LeadService, PipelineService, ReportService, TimelineService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("STORAGE inválido: '{}' (use postgres ou memory)", other),
        }
    }
}

// Configuração lida do ambiente (.env incluso)
#[derive(Debug, Clone)]
pub struct Settings {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub default_status_id: String,
    pub sold_status_id: String,
    pub read_retry_backoff: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage: StorageBackend = env_or("STORAGE", "postgres").parse()?;
        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL deve ser definida quando STORAGE=postgres");
        }

        Ok(Self {
            storage,
            database_url,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", "5")
                .parse()
                .context("DB_MAX_CONNECTIONS deve ser um número")?,
            default_status_id: env_or("DEFAULT_STATUS_ID", "nuovo"),
            sold_status_id: env_or("SOLD_STATUS_ID", "venduto"),
            read_retry_backoff: Duration::from_millis(
                env_or("READ_RETRY_BACKOFF_MS", "150")
                    .parse()
                    .context("READ_RETRY_BACKOFF_MS deve ser um número")?,
            ),
        })
    }

    /// Valores padrão para testes e execução local em memória.
    pub fn for_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            jwt_secret: jwt_secret.into(),
            bind_addr: "127.0.0.1:3000".to_string(),
            db_max_connections: 1,
            default_status_id: "nuovo".to_string(),
            sold_status_id: "venduto".to_string(),
            read_retry_backoff: Duration::from_millis(1),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub i18n_store: I18nStore,
    pub auth_service: AuthService,
    pub pipeline_service: PipelineService,
    pub campaign_service: CampaignService,
    pub timeline_service: TimelineService,
    pub lead_service: LeadService,
    pub backoffice_service: BackOfficeService,
    pub contract_service: ContractService,
    pub report_service: ReportService,
    pub agenda_service: AgendaService,
    pub announcement_service: AnnouncementService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        match settings.storage {
            StorageBackend::Postgres => {
                let database_url = settings
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;

                let db_pool = PgPoolOptions::new()
                    .max_connections(settings.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!()
                    .run(&db_pool)
                    .await
                    .context("Falha ao rodar as migrações do banco de dados")?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                let mut state = Self::from_stores(Stores::postgres(db_pool.clone()), settings)?;
                state.db_pool = Some(db_pool);
                Ok(state)
            }
            StorageBackend::Memory => {
                tracing::warn!("Armazenamento em memória: os dados somem ao reiniciar");
                Self::from_stores(MemoryStore::seeded().stores(), settings)
            }
        }
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_stores(stores: Stores, settings: &Settings) -> anyhow::Result<Self> {
        let retry = ReadRetry::new(settings.read_retry_backoff);

        let pipeline_service = PipelineService::new(
            stores.statuses.clone(),
            stores.leads.clone(),
            retry,
            settings.default_status_id.clone(),
        )
        .with_sold_status(settings.sold_status_id.clone());
        let campaign_service = CampaignService::new(stores.campaigns.clone(), stores.users.clone(), retry);
        let timeline_service = TimelineService::new(stores.timeline.clone(), retry);
        let lead_service = LeadService::new(
            stores.leads.clone(),
            stores.users.clone(),
            pipeline_service.clone(),
            campaign_service.clone(),
            timeline_service.clone(),
            retry,
        );
        let backoffice_service = BackOfficeService::new(stores.backoffice.clone(), stores.leads.clone(), retry);
        let contract_service = ContractService::new(
            stores.contracts.clone(),
            lead_service.clone(),
            pipeline_service.clone(),
            retry,
            settings.sold_status_id.clone(),
        );
        let report_service =
            ReportService::new(timeline_service.clone(), lead_service.clone(), pipeline_service.clone());
        let agenda_service = AgendaService::new(stores.appointments.clone(), stores.leads.clone(), retry);
        let announcement_service = AnnouncementService::new(stores.announcements.clone(), retry);

        Ok(Self {
            db_pool: None,
            i18n_store: I18nStore::load()?,
            auth_service: AuthService::new(settings.jwt_secret.clone()),
            pipeline_service,
            campaign_service,
            timeline_service,
            lead_service,
            backoffice_service,
            contract_service,
            report_service,
            agenda_service,
            announcement_service,
        })
    }
}
