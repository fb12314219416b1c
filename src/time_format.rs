//! Conversions between the 24-hour times stored by the backend and the
//! 12-hour times shown on the board.
//!
//! Every function here is total: blank or malformed input produces an empty
//! string (or `None`/`false`) instead of an error, so a prayer day with a
//! missing field simply renders without that time.

use chrono::{Local, NaiveTime, Timelike};

/// Formats accepted when reading a time, tried in order.
///
/// The backend returns `HH:MM:SS` for `time` columns, admins type `HH:MM`,
/// and values already rendered for display come back as `h:mm AM`.
const INPUT_FORMATS: [&str; 6] = [
    "%H:%M",
    "%H:%M:%S",
    "%I:%M %p",
    "%I:%M%p",
    "%I:%M:%S %p",
    "%I:%M:%S%p",
];

/// Parses a 12h or 24h time string.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
}

/// Converts a time to its 12-hour display form, e.g. `13:05` to `1:05 PM`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(to_12h("00:30"), "12:30 AM");
/// assert_eq!(to_12h(""), "");
/// ```
pub fn to_12h(value: &str) -> String {
    parse_time(value)
        .map(|time| time.format("%-I:%M %p").to_string())
        .unwrap_or_default()
}

/// Converts a time to its 24-hour `HH:MM` form, e.g. `1:05 PM` to `13:05`.
pub fn to_24h(value: &str) -> String {
    parse_time(value).map(format_hhmm).unwrap_or_default()
}

/// Minutes elapsed since midnight for a 12h or 24h time string.
pub fn to_minutes(value: &str) -> Option<u32> {
    parse_time(value).map(minutes_of)
}

/// Minutes elapsed since midnight for a parsed time.
pub fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Strict ordering of two times, which may mix 12h and 24h forms.
///
/// Equal times are not before each other, and a time that does not parse
/// is never before anything.
pub fn is_before(a: &str, b: &str) -> bool {
    match (to_minutes(a), to_minutes(b)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

/// `HH:MM` rendering of a parsed time.
pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Current local wall-clock time as `HH:MM`.
pub fn current_time() -> String {
    format_hhmm(Local::now().time())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_12h() {
        assert_eq!(to_12h("13:05"), "1:05 PM");
        assert_eq!(to_12h("00:30"), "12:30 AM");
        assert_eq!(to_12h("12:00"), "12:00 PM");
        assert_eq!(to_12h("05:00:00"), "5:00 AM");
        assert_eq!(to_12h("9:15 pm"), "9:15 PM");
    }

    #[test]
    fn test_to_12h_blank_or_malformed() {
        assert_eq!(to_12h(""), "");
        assert_eq!(to_12h("   "), "");
        assert_eq!(to_12h("not a time"), "");
        assert_eq!(to_12h("25:00"), "");
    }

    #[test]
    fn test_to_24h() {
        assert_eq!(to_24h("1:05 PM"), "13:05");
        assert_eq!(to_24h("12:30 AM"), "00:30");
        assert_eq!(to_24h("12:10 PM"), "12:10");
        assert_eq!(to_24h("7:45"), "07:45");
        assert_eq!(to_24h("18:00:00"), "18:00");
        assert_eq!(to_24h("garbage"), "");
    }

    #[test]
    fn test_round_trip_through_12h_is_stable() {
        for minute in 0..(24 * 60) {
            let t = format!("{:02}:{:02}", minute / 60, minute % 60);
            let displayed = to_12h(&t);
            assert_eq!(to_12h(&to_24h(&displayed)), displayed, "for {}", t);
        }
    }

    #[test]
    fn test_is_before() {
        assert!(is_before("05:00", "06:15"));
        assert!(!is_before("06:15", "05:00"));
        assert!(!is_before("12:30", "12:30"));
        assert!(is_before("11:59 AM", "12:00"));
        assert!(is_before("12:30", "1:00 PM"));
        assert!(!is_before("", "12:00"));
        assert!(!is_before("12:00", "nope"));
    }

    #[test]
    fn test_to_minutes() {
        assert_eq!(to_minutes("00:00"), Some(0));
        assert_eq!(to_minutes("23:59"), Some(1439));
        assert_eq!(to_minutes("1:30 PM"), Some(810));
        assert_eq!(to_minutes(""), None);
    }

    #[test]
    fn test_current_time_is_hhmm() {
        let now = current_time();
        assert_eq!(now.len(), 5);
        assert!(parse_time(&now).is_some());
    }
}
