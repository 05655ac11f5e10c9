// legal-backend/src/features/mod.rs

pub mod audit;
pub mod auth;
pub mod gdpr;
