use agora_types::{ErrorCode, ValidationError};

use super::Checked;
use crate::settings::Settings;

/// Policy checks for a new password. Hashing happens separately, see
/// [`crate::secret::derive`].
pub fn check_password(password: &str, confirm: Option<&str>, settings: &Settings) -> Checked<()> {
    let len = password.chars().count();
    let (min, max) = (settings.min_password_length, settings.max_password_length);
    if len < min || (max != 0 && len > max) {
        return Err(ValidationError::with_params(
            ErrorCode::OutOfRange,
            "invalid_password_length",
            [min, max],
        ));
    }

    if settings.require_complex_passwords
        && !password.chars().any(|c| !(c.is_alphanumeric() || c == '_'))
    {
        return Err(ValidationError::new(
            ErrorCode::PolicyViolation,
            "no_complex_characters",
        ));
    }

    if confirm.is_some_and(|c| c != password) {
        return Err(ValidationError::new(
            ErrorCode::ConfirmationMismatch,
            "passwords_dont_match",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_is_out_of_range() {
        let settings = Settings::default();
        let err = check_password("abc", None, &settings).unwrap_err();
        assert_eq!(err.code, ErrorCode::OutOfRange);
        assert_eq!(err.params, vec!["6", "30"]);
    }

    #[test]
    fn long_password_respects_max_only_when_set() {
        let long = "x".repeat(40);
        assert!(check_password(&long, None, &Settings::default()).is_err());
        let unbounded = Settings {
            max_password_length: 0,
            ..Settings::default()
        };
        assert!(check_password(&long, None, &unbounded).is_ok());
    }

    #[test]
    fn complex_policy_needs_a_symbol() {
        let settings = Settings {
            require_complex_passwords: true,
            ..Settings::default()
        };
        assert_eq!(
            check_password("letters_and_123", None, &settings).unwrap_err().code,
            ErrorCode::PolicyViolation
        );
        assert!(check_password("letters+123", None, &settings).is_ok());
    }

    #[test]
    fn confirmation_must_match() {
        let settings = Settings::default();
        assert!(check_password("hunter22", Some("hunter22"), &settings).is_ok());
        assert_eq!(
            check_password("hunter22", Some("hunter23"), &settings)
                .unwrap_err()
                .code,
            ErrorCode::ConfirmationMismatch
        );
    }
}
