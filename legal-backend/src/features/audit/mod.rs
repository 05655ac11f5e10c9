// legal-backend/src/features/audit/mod.rs

pub mod models;
pub mod repositories;
pub mod services;
