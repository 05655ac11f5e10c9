use crate::features::gdpr::models::user_consent::Model as ConsentModel;
use crate::shared::datetime::{iso_millis, optional_iso_millis};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentUpdateResponse {
    pub success: bool,
    pub consent_type: String,
    pub granted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecordResponse {
    pub id: Uuid,
    pub consent_type: String,
    pub granted: bool,
    pub active: bool,
    #[serde(with = "optional_iso_millis")]
    pub granted_at: Option<DateTime<Utc>>,
    #[serde(with = "optional_iso_millis")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

impl From<ConsentModel> for ConsentRecordResponse {
    fn from(consent: ConsentModel) -> Self {
        Self {
            id: consent.id,
            active: consent.is_active(),
            consent_type: consent.consent_type,
            granted: consent.is_granted,
            granted_at: consent.granted_at,
            revoked_at: consent.revoked_at,
            created_at: consent.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentListResponse {
    pub consents: Vec<ConsentRecordResponse>,
    pub total: usize,
}
