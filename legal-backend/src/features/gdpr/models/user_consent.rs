// legal-backend/src/features/gdpr/models/user_consent.rs

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 同意の種類。未知の値も Custom として保持する
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConsentType {
    DataProcessing,
    DataErasureRequest,
    Marketing,
    Analytics,
    AiTraining,
    Custom(String),
}

impl ConsentType {
    pub fn as_str(&self) -> &str {
        match self {
            ConsentType::DataProcessing => "data_processing",
            ConsentType::DataErasureRequest => "data_erasure_request",
            ConsentType::Marketing => "marketing",
            ConsentType::Analytics => "analytics",
            ConsentType::AiTraining => "ai_training",
            ConsentType::Custom(value) => value,
        }
    }
}

impl From<String> for ConsentType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "data_processing" => ConsentType::DataProcessing,
            "data_erasure_request" => ConsentType::DataErasureRequest,
            "marketing" => ConsentType::Marketing,
            "analytics" => ConsentType::Analytics,
            "ai_training" => ConsentType::AiTraining,
            _ => ConsentType::Custom(value),
        }
    }
}

impl From<&str> for ConsentType {
    fn from(value: &str) -> Self {
        ConsentType::from(value.to_string())
    }
}

impl From<ConsentType> for String {
    fn from(consent_type: ConsentType) -> Self {
        match consent_type {
            ConsentType::Custom(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ConsentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 同意レコード。撤回は revoked_at の設定で表し、行は削除しない
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_consents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub consent_type: String,
    pub is_granted: bool,
    pub granted_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// 消去後も同意履歴を残すため、usersへの外部キーは持たない
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn new(
        user_id: Uuid,
        consent_type: &ConsentType,
        is_granted: bool,
        ip_address: Option<String>,
        user_agent: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            consent_type: consent_type.as_str().to_string(),
            is_granted,
            granted_at: if is_granted { Some(now) } else { None },
            revoked_at: None,
            ip_address,
            user_agent,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_consent_type(&self) -> ConsentType {
        ConsentType::from(self.consent_type.clone())
    }

    /// granted かつ未撤回
    pub fn is_active(&self) -> bool {
        self.is_granted && self.revoked_at.is_none()
    }
}
