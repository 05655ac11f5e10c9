use serde::Deserialize;
use validator::Validate;

/// 監査ログ取得のクエリパラメータ
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    #[validate(range(min = 1, max = 1000, message = "Limit must be between 1 and 1000"))]
    pub limit: Option<u64>,
    pub event_type: Option<String>,
    pub success: Option<bool>,
}
