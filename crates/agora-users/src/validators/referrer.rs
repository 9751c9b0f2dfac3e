use agora_types::{ErrorCode, Uid, ValidationError};

use super::Checked;

/// Resolve a referrer name to a user id with `lookup`. Returns 0 when
/// referrals are off or no name was given; lookup failures propagate.
pub fn resolve_referrer<F>(name: &str, enabled: bool, lookup: F) -> anyhow::Result<Checked<Uid>>
where
    F: FnOnce(&str) -> anyhow::Result<Option<Uid>>,
{
    let name = name.trim();
    if !enabled || name.is_empty() {
        return Ok(Ok(0));
    }

    Ok(lookup(name)?.ok_or_else(|| {
        ValidationError::with_params(ErrorCode::UnresolvedReference, "invalid_referrer", [name])
    }))
}
