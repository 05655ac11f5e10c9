use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::shared::validation::validate_no_control_chars;

/// GDPR deletion request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct DataDeletionRequest {
    /// 省略時は未確認として扱う
    pub confirmed: Option<bool>,
    pub export_before_delete: bool,
    #[validate(
        length(max = 500, message = "Reason cannot exceed 500 characters"),
        custom(function = validate_no_control_chars)
    )]
    pub reason: Option<String>,
}

impl DataDeletionRequest {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed == Some(true)
    }
}
