pub mod gdpr;

pub use gdpr::gdpr_router;
