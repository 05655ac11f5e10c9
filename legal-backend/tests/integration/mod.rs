// tests/integration/mod.rs

pub mod gdpr;
