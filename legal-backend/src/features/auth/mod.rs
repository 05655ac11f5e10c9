// legal-backend/src/features/auth/mod.rs

pub mod models;
pub mod repositories;
