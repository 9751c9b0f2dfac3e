use std::sync::LazyLock;

use agora_types::{ErrorCode, ValidationError};
use regex::Regex;

use super::Checked;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
    )
    .expect("EMAIL_REGEX is a valid regex pattern")
});

/// Structural address check shared with the email-style messenger handle.
pub fn is_valid_email(address: &str) -> bool {
    address.len() <= 254 && EMAIL_REGEX.is_match(address)
}

/// Returns the trimmed address.
pub fn check_email(email: &str, confirm: Option<&str>, banned: &[String]) -> Checked<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::new(ErrorCode::MissingField, "missing_email"));
    }

    if !is_valid_email(email) {
        return Err(ValidationError::new(
            ErrorCode::InvalidFormat,
            "invalid_email_format",
        ));
    }

    let lowered = email.to_lowercase();
    let is_banned = banned
        .iter()
        .map(|b| b.trim().to_lowercase())
        .any(|b| !b.is_empty() && lowered.contains(&b));
    if is_banned {
        return Err(ValidationError::new(ErrorCode::PolicyViolation, "banned_email"));
    }

    if confirm.is_some_and(|c| c.trim() != email) {
        return Err(ValidationError::new(
            ErrorCode::ConfirmationMismatch,
            "emails_dont_match",
        ));
    }

    Ok(email.to_string())
}
