use agora_types::{AwayInput, AwayStatus, ErrorCode, ValidationError};

/// Presence status. Anything other than an allowed "away" request resets to
/// present with cleared details. A return date must be a complete `d-m-y`.
pub fn check_away(
    input: Option<&AwayInput>,
    allow_away: bool,
    now: i64,
) -> (AwayStatus, Option<ValidationError>) {
    let Some(input) = input.filter(|a| allow_away && a.away) else {
        return (AwayStatus::default(), None);
    };

    let return_date = input.return_date.as_deref().unwrap_or("").trim();
    let error = (!return_date.is_empty() && !is_complete_date(return_date))
        .then(|| ValidationError::new(ErrorCode::MissingField, "missing_returndate"));

    let status = AwayStatus {
        away: true,
        date: input.date.filter(|d| *d > 0).unwrap_or(now),
        return_date: return_date.to_string(),
        reason: input.reason.as_deref().unwrap_or("").trim().to_string(),
    };
    (status, error)
}

fn is_complete_date(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split('-').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| p.trim().parse::<u32>().is_ok_and(|n| n > 0))
}
