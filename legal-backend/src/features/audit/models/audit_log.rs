// legal-backend/src/features/audit/models/audit_log.rs
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 監査ログの1エントリ。追記のみで更新・削除はしない
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    pub event_type: String,
    pub user_id: Uuid,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub action: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub details: Json,
    pub success: bool,
    pub prev_hash: String,
    #[sea_orm(unique)]
    pub hash: String,
}

// 監査ログはユーザー削除後も残すため、usersへのリレーションは持たない
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub type AuditLogEntry = Model;

// 監査イベントの定義
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditEvent {
    GdprExport,
    GdprDelete,
    ConsentGranted,
    ConsentRevoked,
    Custom(String),
}

impl AuditEvent {
    pub fn as_str(&self) -> &str {
        match self {
            AuditEvent::GdprExport => "gdpr.export",
            AuditEvent::GdprDelete => "gdpr.delete",
            AuditEvent::ConsentGranted => "consent.granted",
            AuditEvent::ConsentRevoked => "consent.revoked",
            AuditEvent::Custom(event) => event,
        }
    }
}

/// ハッシュ計算前のエントリ内容
#[derive(Debug, Clone, PartialEq)]
pub struct AuditDraft {
    pub event_type: String,
    pub user_id: Uuid,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub action: String,
    pub details: Json,
    pub success: bool,
}

// 監査ログエントリービルダー
pub struct AuditLogBuilder {
    user_id: Uuid,
    event: AuditEvent,
    resource_type: String,
    resource_id: Option<String>,
    action: Option<String>,
    details: Json,
    success: bool,
}

impl AuditLogBuilder {
    pub fn new(user_id: Uuid, event: AuditEvent, resource_type: impl Into<String>) -> Self {
        Self {
            user_id,
            event,
            resource_type: resource_type.into(),
            resource_id: None,
            action: None,
            details: Json::Object(Default::default()),
            success: true,
        }
    }

    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn details(mut self, details: Json) -> Self {
        self.details = details;
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn build(self) -> AuditDraft {
        let event_type = self.event.as_str().to_string();
        // actionが省略された場合はイベント名の末尾を使う（gdpr.export → export）
        let action = self.action.unwrap_or_else(|| {
            event_type
                .rsplit('.')
                .next()
                .unwrap_or(event_type.as_str())
                .to_string()
        });

        AuditDraft {
            event_type,
            user_id: self.user_id,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            action,
            details: self.details,
            success: self.success,
        }
    }
}

/// 監査ログの検索条件
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub event_type: Option<String>,
    pub success: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

impl AuditLogFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(user_id) = self.user_id {
            if entry.user_id != user_id {
                return false;
            }
        }
        if let Some(event_type) = &self.event_type {
            if &entry.event_type != event_type {
                return false;
            }
        }
        if let Some(success) = self.success {
            if entry.success != success {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.created_at >= until {
                return false;
            }
        }
        true
    }
}
