//! Lenient date and time normalisation for spreadsheet exports.
//!
//! Spreadsheets rarely agree on formats: dates come as `2024-06-15`,
//! `15/06/2024` or `6.15.24`, times as `5:30`, `5.30`, `0530` or `5:30 pm`.
//! Everything is normalised to ISO dates and 24h `HH:MM` times.

use chrono::{NaiveDate, NaiveTime};

use crate::{
    prayers::DATE_FORMAT,
    time_format::{format_hhmm, parse_time},
};

const DATE_SEPARATORS: [char; 3] = ['/', '-', '.'];

/// Normalises a date to `YYYY-MM-DD`.
///
/// Numeric `A/B/Y` dates are read day first when `A > 12`, month first when
/// only `B > 12`, and day first when both could be a month. A four digit
/// first component is a year, whatever the separator.
pub fn normalise_date(value: &str) -> Option<String> {
    let value = value.trim();
    let parts: Vec<&str> = value.split(DATE_SEPARATORS).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };
    let numbers: Vec<u32> = [first, second, third]
        .iter()
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;

    let (year, month, day) = if first.trim().len() == 4 {
        (numbers[0], numbers[1], numbers[2])
    } else {
        let (a, b, year) = (numbers[0], numbers[1], numbers[2]);
        let year = if third.trim().len() <= 2 { 2000 + year } else { year };
        if a > 12 || b <= 12 {
            (year, b, a)
        } else {
            (year, a, b)
        }
    };

    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
        .map(|date| date.format(DATE_FORMAT).to_string())
}

/// Normalises a time to 24h `HH:MM`.
///
/// Accepts `HH:MM`, `H.MM`, `HHMM`, a bare hour and 12h forms with AM/PM.
pub fn normalise_time(value: &str) -> Option<String> {
    let value = value.trim().to_uppercase();
    if value.is_empty() {
        return None;
    }

    if let Some(time) = parse_time(&value) {
        return Some(format_hhmm(time));
    }

    let dotted = value.replacen('.', ":", 1);
    if let Some(time) = parse_time(&dotted) {
        return Some(format_hhmm(time));
    }

    if !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let number: u32 = value.parse().ok()?;
    let (hour, minute) = match value.len() {
        1 | 2 => (number, 0),
        3 | 4 => (number / 100, number % 100),
        _ => return None,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).map(format_hhmm)
}
