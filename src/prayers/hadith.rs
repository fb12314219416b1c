//! Daily hadith selection.

use chrono::{Datelike, NaiveDate};

use crate::prayers::{
    defaults::default_hadith,
    structs::{DailyHadith, HadithItem, HadithText},
};

/// Picks the hadith shown on `date`.
///
/// Precedence: a calendar item matching both month and day, then a
/// calendar item matching the day with no month, then an active collection
/// item rotated by day of year, then the built-in hadith.
pub fn select_daily(
    calendar: &[DailyHadith],
    collection: &[HadithItem],
    date: NaiveDate,
) -> HadithText {
    let day = date.day();
    let month = date.month();

    let month_match = calendar
        .iter()
        .find(|h| h.day_of_month == day && h.month == Some(month));
    let day_match = || {
        calendar
            .iter()
            .find(|h| h.day_of_month == day && h.month.is_none())
    };

    if let Some(hadith) = month_match.or_else(day_match) {
        return HadithText {
            text: hadith.text.clone(),
            source: hadith.source.clone(),
        };
    }

    let active: Vec<&HadithItem> = collection.iter().filter(|h| h.active).collect();
    if active.is_empty() {
        return default_hadith();
    }

    let item = active[date.ordinal0() as usize % active.len()];
    HadithText {
        text: item.text.clone(),
        source: item.source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar_item(day: u32, month: Option<u32>, text: &str) -> DailyHadith {
        DailyHadith {
            id: None,
            day_of_month: day,
            month,
            text: text.to_owned(),
            source: "src".to_owned(),
        }
    }

    fn collection_item(text: &str, active: bool) -> HadithItem {
        HadithItem {
            id: None,
            text: text.to_owned(),
            source: "src".to_owned(),
            active,
        }
    }

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn test_month_and_day_match_wins() {
        let calendar = vec![
            calendar_item(15, None, "any month"),
            calendar_item(15, Some(6), "june"),
            calendar_item(15, Some(7), "july"),
        ];
        assert_eq!(select_daily(&calendar, &[], june(15)).text, "june");
    }

    #[test]
    fn test_day_only_match() {
        let calendar = vec![
            calendar_item(15, Some(7), "july"),
            calendar_item(15, None, "any month"),
        ];
        assert_eq!(select_daily(&calendar, &[], june(15)).text, "any month");
    }

    #[test]
    fn test_collection_rotation_skips_inactive() {
        let collection = vec![
            collection_item("a", true),
            collection_item("hidden", false),
            collection_item("b", true),
        ];
        let first = select_daily(&[], &collection, june(1)).text;
        let second = select_daily(&[], &collection, june(2)).text;
        assert_ne!(first, second);
        assert_ne!(first, "hidden");
        assert_ne!(second, "hidden");
    }

    #[test]
    fn test_builtin_fallback() {
        let collection = vec![collection_item("hidden", false)];
        assert_eq!(
            select_daily(&[calendar_item(3, None, "x")], &collection, june(15)),
            default_hadith()
        );
    }
}
