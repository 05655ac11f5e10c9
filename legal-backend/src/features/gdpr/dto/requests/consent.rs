use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::shared::validation::validate_no_control_chars;

/// Consent grant / revoke request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConsentUpdateRequest {
    #[serde(default)]
    #[validate(
        length(
            min = 1,
            max = 64,
            message = "Consent type must be between 1 and 64 characters"
        ),
        custom(function = validate_no_control_chars)
    )]
    pub consent_type: String,
    #[serde(default)]
    pub granted: bool,
}
