use std::sync::LazyLock;

use agora_types::{ErrorCode, ValidationError};
use regex::Regex;

use super::Checked;
use crate::settings::Settings;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("WHITESPACE_RUN is a valid regex pattern"));

/// Characters that would break markup or storage escaping.
const FORBIDDEN_CHARS: [char; 5] = ['<', '>', '&', '\\', ';'];

/// Canonical spelling of a submitted name: exotic whitespace becomes a plain
/// space, a soft hyphen becomes `-`, runs of spaces collapse to one.
pub fn normalize_username(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '\u{00AD}' => '-',
            c if c.is_whitespace() || c.is_control() => ' ',
            c => c,
        })
        .collect();
    WHITESPACE_RUN.replace_all(&replaced, " ").trim().to_string()
}

/// Syntactic checks on an already normalized name. Uniqueness needs storage
/// and is checked by the caller.
pub fn check_username(name: &str, settings: &Settings, banned: &[String]) -> Checked<()> {
    if name.is_empty() {
        return Err(ValidationError::new(ErrorCode::MissingField, "missing_username"));
    }

    if banned.iter().any(|b| b == name) {
        return Err(ValidationError::new(ErrorCode::PolicyViolation, "banned_username"));
    }

    if name.contains(FORBIDDEN_CHARS) {
        return Err(ValidationError::new(
            ErrorCode::InvalidFormat,
            "bad_characters_username",
        ));
    }

    let len = name.chars().count();
    let (min, max) = (settings.min_name_length, settings.max_name_length);
    if (max != 0 && len > max) || (min != 0 && len < min) {
        return Err(ValidationError::with_params(
            ErrorCode::OutOfRange,
            "invalid_username_length",
            [min, max],
        ));
    }

    Ok(())
}
