pub mod announcement_repo;
pub mod appointment_repo;
pub mod backoffice_repo;
pub mod campaign_repo;
pub mod contract_repo;
pub mod lead_repo;
pub mod memory;
pub mod status_repo;
pub mod store;
pub mod timeline_repo;
pub mod user_repo;

pub use announcement_repo::AnnouncementRepository;
pub use appointment_repo::AppointmentRepository;
pub use backoffice_repo::BackOfficeRepository;
pub use campaign_repo::CampaignRepository;
pub use contract_repo::ContractRepository;
pub use lead_repo::LeadRepository;
pub use memory::MemoryStore;
pub use status_repo::StatusRepository;
pub use store::Stores;
pub use timeline_repo::TimelineRepository;
pub use user_repo::UserRepository;

use std::sync::Arc;

use sqlx::PgPool;

impl Stores {
    /// Repositórios Postgres compartilhando o mesmo pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            leads: Arc::new(LeadRepository::new(pool.clone())),
            statuses: Arc::new(StatusRepository::new(pool.clone())),
            campaigns: Arc::new(CampaignRepository::new(pool.clone())),
            timeline: Arc::new(TimelineRepository::new(pool.clone())),
            backoffice: Arc::new(BackOfficeRepository::new(pool.clone())),
            contracts: Arc::new(ContractRepository::new(pool.clone())),
            appointments: Arc::new(AppointmentRepository::new(pool.clone())),
            announcements: Arc::new(AnnouncementRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool)),
        }
    }
}
