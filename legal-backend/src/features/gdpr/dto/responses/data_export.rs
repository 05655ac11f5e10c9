use crate::features::gdpr::models::export_manifest::ExportFormat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// GDPR data export response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExportResponse {
    pub success: bool,
    pub file_path: String,
    pub total_records: u64,
    pub export_date: String,
    pub format: ExportFormat,
    pub audit_log_id: Uuid,
}
