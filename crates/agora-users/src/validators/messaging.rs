use agora_types::{ErrorCode, ValidationError};

use super::Checked;
use super::email::is_valid_email;

/// Numeric messenger id. Empty means none (0).
pub fn check_icq(raw: &str) -> Checked<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid_icq());
    }
    raw.parse().map_err(|_| invalid_icq())
}

fn invalid_icq() -> ValidationError {
    ValidationError::new(ErrorCode::InvalidFormat, "invalid_icq_number")
}

/// Email-style messenger handle.
pub fn check_msn(raw: &str) -> Checked<String> {
    let raw = raw.trim();
    if !raw.is_empty() && !is_valid_email(raw) {
        return Err(ValidationError::new(
            ErrorCode::InvalidFormat,
            "invalid_msn_address",
        ));
    }
    Ok(raw.to_string())
}
