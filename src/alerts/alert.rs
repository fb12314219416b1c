//! Jamat alerts and the table they are fired from.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::{
    prayers::{JummahSetting, PrayerDay, PrayerName, jummah_times},
    time_format::to_24h,
};

/// One congregation time the board announces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JamatEntry {
    pub prayer: PrayerName,
    /// 24h `HH:MM`
    pub time: String,
}

/// An alert that is due.
///
/// Two alerts are equal when they share prayer, minute and date, which makes
/// the alert its own key in the fired set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrayerAlert {
    pub prayer: PrayerName,
    /// 24h `HH:MM`
    pub time: String,
    pub date: NaiveDate,
}

impl fmt::Display for PrayerAlert {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} jamat at {} on {}", self.prayer, self.time, self.date)
    }
}

/// Day and Jummah setting the jamat table is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub day: PrayerDay,
    pub jummah: Option<JummahSetting>,
}

/// Builds the jamat table of `schedule` for the local date `today`.
///
/// When `today` is a Friday, Zuhr is announced as Jummah. The shown day may
/// be a later one when today's row is missing, so the weekday comes from
/// `today` and never from the row. Entries whose time cannot be parsed are
/// left out.
///
/// # Examples
///
/// ```no_run
/// let table = jamat_table(&Schedule { day, jummah: None }, today);
/// assert_eq!(table[0].prayer, PrayerName::Fajr);
/// ```
pub fn jamat_table(schedule: &Schedule, today: NaiveDate) -> Vec<JamatEntry> {
    let day = &schedule.day;

    let (zuhr, zuhr_time) = if today.weekday() == Weekday::Fri {
        let (first, _) = jummah_times(day, schedule.jummah.as_ref());
        (PrayerName::Jummah, first)
    } else {
        (PrayerName::Zuhr, day.zuhr_jamat.clone())
    };

    [
        (PrayerName::Fajr, day.fajr_jamat.as_str()),
        (zuhr, zuhr_time.as_str()),
        (PrayerName::Asr, day.asr_jamat.as_str()),
        (PrayerName::Maghrib, day.maghrib_iftar.as_str()),
        (PrayerName::Isha, day.isha_first_jamat.as_str()),
    ]
    .into_iter()
    .map(|(prayer, time)| JamatEntry {
        prayer,
        time: to_24h(time),
    })
    .filter(|entry| !entry.time.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(date: &str) -> PrayerDay {
        PrayerDay {
            date: date.to_owned(),
            fajr_jamat: "4:30 AM".to_owned(),
            zuhr_jamat: "13:30:00".to_owned(),
            asr_jamat: "18:00".to_owned(),
            maghrib_iftar: "9:15 PM".to_owned(),
            isha_first_jamat: "".to_owned(),
            ..Default::default()
        }
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn jummah_at(first: &str) -> Option<JummahSetting> {
        Some(JummahSetting {
            first_jamat: first.to_owned(),
            second_jamat: Some("14:30".to_owned()),
        })
    }

    #[test]
    fn test_table_is_normalised() {
        let table = jamat_table(
            &Schedule {
                day: day("2024-06-12"),
                jummah: None,
            },
            date("2024-06-12"),
        );

        let times: Vec<_> = table
            .iter()
            .map(|entry| (entry.prayer, entry.time.as_str()))
            .collect();
        assert_eq!(
            times,
            vec![
                (PrayerName::Fajr, "04:30"),
                (PrayerName::Zuhr, "13:30"),
                (PrayerName::Asr, "18:00"),
                (PrayerName::Maghrib, "21:15"),
            ]
        );
    }

    // 2024-06-13 is a Thursday, 2024-06-14 a Friday
    #[test]
    fn test_friday_announces_jummah() {
        let with_setting = jamat_table(
            &Schedule {
                day: day("2024-06-14"),
                jummah: jummah_at("13:45"),
            },
            date("2024-06-14"),
        );
        assert_eq!(with_setting[1].prayer, PrayerName::Jummah);
        assert_eq!(with_setting[1].time, "13:45");

        let without = jamat_table(
            &Schedule {
                day: day("2024-06-14"),
                jummah: None,
            },
            date("2024-06-14"),
        );
        assert_eq!(without[1].prayer, PrayerName::Jummah);
        assert_eq!(without[1].time, "13:30");
    }

    #[test]
    fn test_friday_row_shown_on_thursday_keeps_zuhr() {
        let table = jamat_table(
            &Schedule {
                day: day("2024-06-14"),
                jummah: jummah_at("13:45"),
            },
            date("2024-06-13"),
        );

        assert_eq!(table[1].prayer, PrayerName::Zuhr);
        assert_eq!(table[1].time, "13:30");
        assert!(table.iter().all(|entry| entry.prayer != PrayerName::Jummah));
    }

    #[test]
    fn test_saturday_row_shown_on_friday_announces_jummah() {
        let table = jamat_table(
            &Schedule {
                day: day("2024-06-15"),
                jummah: jummah_at("13:45"),
            },
            date("2024-06-14"),
        );

        assert_eq!(table[1].prayer, PrayerName::Jummah);
        assert_eq!(table[1].time, "13:45");
        assert!(table.iter().all(|entry| entry.prayer != PrayerName::Zuhr));
    }
}
