use crate::features::audit::models::audit_log::AuditLogEntry;
use crate::shared::datetime::iso_millis;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub id: Uuid,
    pub sequence: i64,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub success: bool,
    pub details: Value,
    pub hash: String,
    pub prev_hash: String,
}

impl From<AuditLogEntry> for AuditLogResponse {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            id: entry.id,
            sequence: entry.sequence,
            timestamp: entry.created_at,
            event_type: entry.event_type,
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            success: entry.success,
            details: entry.details,
            hash: entry.hash,
            prev_hash: entry.prev_hash,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogListResponse {
    pub entries: Vec<AuditLogResponse>,
    pub total: usize,
}
