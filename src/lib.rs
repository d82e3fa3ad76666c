// src/lib.rs

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod kanban;
pub mod middleware;
pub mod models;
pub mod services;
