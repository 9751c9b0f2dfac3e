use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

/// Board settings consulted by the validators.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Username length bounds in characters; 0 disables a bound.
    pub min_name_length: usize,
    pub max_name_length: usize,
    /// Password length bounds in characters; 0 disables a bound.
    pub min_password_length: usize,
    pub max_password_length: usize,
    /// Require at least one non-word character in passwords.
    pub require_complex_passwords: bool,
    /// Substrings that may not appear in an email address.
    pub banned_emails: Vec<String>,
    pub threads_per_page_options: Vec<u32>,
    pub posts_per_page_options: Vec<u32>,
    pub use_referrals: bool,
    pub allow_away: bool,
    /// Group assigned when an insert does not name one.
    pub default_usergroup: i64,
    /// Installed language packs.
    pub languages: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_name_length: 3,
            max_name_length: 30,
            min_password_length: 6,
            max_password_length: 30,
            require_complex_passwords: false,
            banned_emails: Vec::new(),
            threads_per_page_options: vec![5, 10, 20, 25, 40, 50],
            posts_per_page_options: vec![5, 10, 20, 25, 40],
            use_referrals: true,
            allow_away: true,
            default_usergroup: 2,
            languages: vec!["english".into()],
        }
    }
}

impl Settings {
    /// Load settings from the environment (and `.env` if present).
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            min_name_length: parse_var(&lookup, "AGORA_MIN_NAME_LENGTH", defaults.min_name_length)?,
            max_name_length: parse_var(&lookup, "AGORA_MAX_NAME_LENGTH", defaults.max_name_length)?,
            min_password_length: parse_var(
                &lookup,
                "AGORA_MIN_PASSWORD_LENGTH",
                defaults.min_password_length,
            )?,
            max_password_length: parse_var(
                &lookup,
                "AGORA_MAX_PASSWORD_LENGTH",
                defaults.max_password_length,
            )?,
            require_complex_passwords: bool_var(
                &lookup,
                "AGORA_COMPLEX_PASSWORDS",
                defaults.require_complex_passwords,
            )?,
            banned_emails: lookup("AGORA_BANNED_EMAILS")
                .map(|raw| {
                    raw.split_whitespace()
                        .map(|s| s.to_lowercase())
                        .collect()
                })
                .unwrap_or(defaults.banned_emails),
            threads_per_page_options: list_var(
                &lookup,
                "AGORA_TPP_OPTIONS",
                defaults.threads_per_page_options,
            )?,
            posts_per_page_options: list_var(
                &lookup,
                "AGORA_PPP_OPTIONS",
                defaults.posts_per_page_options,
            )?,
            use_referrals: bool_var(&lookup, "AGORA_USE_REFERRALS", defaults.use_referrals)?,
            allow_away: bool_var(&lookup, "AGORA_ALLOW_AWAY", defaults.allow_away)?,
            default_usergroup: parse_var(
                &lookup,
                "AGORA_DEFAULT_USERGROUP",
                defaults.default_usergroup,
            )?,
            languages: lookup("AGORA_LANGUAGES")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.languages),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn bool_var<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(anyhow!("invalid value for {key}: {other:?}")),
    }
}

fn list_var<F>(lookup: &F, key: &str, default: Vec<u32>) -> Result<Vec<u32>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .with_context(|| format!("invalid entry in {key}: {s:?}"))
        })
        .collect()
}
