// src/services.rs

pub mod agenda_service;
pub mod announcement_service;
pub mod auth;
pub mod backoffice_service;
pub mod campaign_service;
pub mod contract_service;
pub mod distribution;
pub mod lead_service;
pub mod pipeline_service;
pub mod report_service;
pub mod timeline_service;

pub use agenda_service::AgendaService;
pub use announcement_service::AnnouncementService;
pub use backoffice_service::BackOfficeService;
pub use campaign_service::CampaignService;
pub use contract_service::ContractService;
pub use lead_service::LeadService;
pub use pipeline_service::{PipelineService, TransitionOptions};
pub use report_service::ReportService;
pub use timeline_service::TimelineService;
