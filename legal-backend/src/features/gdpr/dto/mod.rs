pub mod requests;
pub mod responses;

// Requests
pub use requests::{AuditLogQuery, ConsentUpdateRequest, DataDeletionRequest, DataExportRequest};

// Responses
pub use responses::{
    AuditLogListResponse, AuditLogResponse, ConsentListResponse, ConsentRecordResponse,
    ConsentUpdateResponse, DataDeletionResponse, DataExportResponse,
};
