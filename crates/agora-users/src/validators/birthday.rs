use agora_types::{BirthdayInput, ErrorCode, ValidationError};
use chrono::{Datelike, NaiveDate};

use super::Checked;

/// Leap year used to check day/month pairs when the year is unknown, so
/// 29 February is accepted.
const LEAP_PROBE_YEAR: i32 = 2000;

/// Oldest accepted birth year, relative to today.
const MAX_AGE_YEARS: i32 = 100;

/// Validate a birth date and return its stored encoding.
pub fn check_birthday(input: BirthdayInput, today: NaiveDate) -> Checked<String> {
    let day = input.day.unwrap_or(0);
    let month = input.month.unwrap_or(0);
    let year = input.year.unwrap_or(0);

    if day != 0 && month != 0 {
        let probe = if year != 0 { year } else { LEAP_PROBE_YEAR };
        if NaiveDate::from_ymd_opt(probe, month, day).is_none() {
            return Err(ValidationError::new(ErrorCode::InvalidFormat, "invalid_birthday"));
        }
    }

    if year != 0 {
        let current = today.year();
        if year < current - MAX_AGE_YEARS || year > current {
            return Err(ValidationError::new(ErrorCode::OutOfRange, "invalid_birthday"));
        }
    }

    Ok(encode_birthday(day, month, year))
}

/// `d-m-y` when the year is known, `d-m-` when only day and month are,
/// empty otherwise.
pub fn encode_birthday(day: u32, month: u32, year: i32) -> String {
    if year != 0 {
        format!("{day}-{month}-{year}")
    } else if day != 0 && month != 0 {
        format!("{day}-{month}-")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn bday(day: u32, month: u32, year: i32) -> BirthdayInput {
        BirthdayInput {
            day: Some(day),
            month: Some(month),
            year: Some(year),
        }
    }

    #[test]
    fn february_rules() {
        assert!(check_birthday(bday(31, 2, 1990), today()).is_err());
        assert_eq!(check_birthday(bday(29, 2, 2000), today()).unwrap(), "29-2-2000");
        assert!(check_birthday(bday(29, 2, 1999), today()).is_err());
        // unknown year: 29 February is a real day in some year
        assert_eq!(check_birthday(bday(29, 2, 0), today()).unwrap(), "29-2-");
    }

    #[test]
    fn impossible_days_and_months() {
        assert!(check_birthday(bday(31, 4, 1990), today()).is_err());
        assert!(check_birthday(bday(1, 13, 1990), today()).is_err());
        assert!(check_birthday(bday(32, 1, 0), today()).is_err());
    }

    #[test]
    fn year_window_is_last_hundred_years() {
        assert!(check_birthday(bday(1, 1, 1926), today()).is_ok());
        let err = check_birthday(bday(1, 1, 1925), today()).unwrap_err();
        assert_eq!(err.code, ErrorCode::OutOfRange);
        assert!(check_birthday(bday(1, 1, 2027), today()).is_err());
    }

    #[test]
    fn unknown_birthday_encodes_empty() {
        assert_eq!(check_birthday(BirthdayInput::default(), today()).unwrap(), "");
        let year_only = BirthdayInput {
            year: Some(1980),
            ..BirthdayInput::default()
        };
        assert_eq!(check_birthday(year_only, today()).unwrap(), "0-0-1980");
    }
}
