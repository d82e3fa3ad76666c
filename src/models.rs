pub mod agenda;
pub mod announcement;
pub mod auth;
pub mod backoffice;
pub mod campaign;
pub mod contract;
pub mod lead;
pub mod pipeline;
pub mod rbac;
pub mod report;
pub mod timeline;
