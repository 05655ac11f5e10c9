pub mod audit_log;
pub mod consent;
pub mod data_deletion;
pub mod data_export;

pub use audit_log::AuditLogQuery;
pub use consent::ConsentUpdateRequest;
pub use data_deletion::DataDeletionRequest;
pub use data_export::DataExportRequest;
