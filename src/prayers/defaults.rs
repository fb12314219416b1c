//! Built-in last resort values, used when neither the backend nor the
//! local mirror can provide anything.

use chrono::NaiveDate;

use crate::prayers::structs::{DATE_FORMAT, HadithText, PrayerDay, weekday_name};

/// Default prayer times stamped with `date`.
///
/// The returned day has no identifier and is never written to the mirror.
pub fn default_day(date: NaiveDate) -> PrayerDay {
    PrayerDay {
        id: None,
        date: date.format(DATE_FORMAT).to_string(),
        day: weekday_name(date),
        sehri_end: "05:00".to_owned(),
        fajr_jamat: "05:30".to_owned(),
        sunrise: "06:30".to_owned(),
        zuhr_start: "12:30".to_owned(),
        zuhr_jamat: "13:30".to_owned(),
        asr_start: "15:30".to_owned(),
        asr_jamat: "16:00".to_owned(),
        maghrib_iftar: "18:00".to_owned(),
        isha_start: "19:30".to_owned(),
        isha_first_jamat: "20:00".to_owned(),
        isha_second_jamat: None,
    }
}

pub fn default_hadith() -> HadithText {
    HadithText {
        text: "The most beloved of deeds to Allah are those that are most consistent, even if they are small.".to_owned(),
        source: "Sahih al-Bukhari 6464".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_day_is_stamped() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let day = default_day(date);
        assert_eq!(day.date, "2024-06-14");
        assert_eq!(day.day, "Friday");
        assert_eq!(day.id, None);
        assert_eq!(day.calendar_date(), Some(date));
    }
}
