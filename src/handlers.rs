// src/handlers.rs

pub mod agenda;
pub mod announcements;
pub mod backoffice;
pub mod campaigns;
pub mod contracts;
pub mod health;
pub mod kanban;
pub mod leads;
pub mod me;
pub mod reports;
pub mod statuses;
