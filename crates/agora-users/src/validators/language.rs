use agora_types::{ErrorCode, ValidationError};

use super::Checked;
use crate::ports::Localization;

/// Empty selects the board default.
pub fn check_language(language: &str, locales: &dyn Localization) -> Checked<String> {
    let language = language.trim();
    if !language.is_empty() && !locales.language_exists(language) {
        return Err(ValidationError::new(ErrorCode::InvalidFormat, "invalid_language"));
    }
    Ok(language.to_string())
}
