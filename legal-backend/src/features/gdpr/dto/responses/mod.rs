pub mod audit_log;
pub mod consent;
pub mod data_deletion;
pub mod data_export;

pub use audit_log::{AuditLogListResponse, AuditLogResponse};
pub use consent::{ConsentListResponse, ConsentRecordResponse, ConsentUpdateResponse};
pub use data_deletion::DataDeletionResponse;
pub use data_export::DataExportResponse;
