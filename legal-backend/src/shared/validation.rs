// legal-backend/src/shared/validation.rs

use validator::ValidationError;

/// 制御文字（NUL を含む）を拒否する。改行とタブは許可する
pub fn validate_no_control_chars(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        let mut error = ValidationError::new("control_characters");
        error.message = Some("Control characters are not allowed".into());
        return Err(error);
    }
    Ok(())
}
