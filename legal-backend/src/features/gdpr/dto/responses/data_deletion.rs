use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// GDPR deletion response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDeletionResponse {
    pub success: bool,
    pub deletion_date: String,
    pub deleted_counts: BTreeMap<String, u64>,
    pub preserved_audit_logs: u64,
    pub preserved_consents: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,
    pub audit_log_id: Uuid,
}
