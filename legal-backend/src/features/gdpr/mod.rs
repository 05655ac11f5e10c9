// legal-backend/src/features/gdpr/mod.rs

pub mod dto;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod services;
