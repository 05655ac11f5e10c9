pub mod export_manifest;
pub mod user_consent;
pub mod user_data;
