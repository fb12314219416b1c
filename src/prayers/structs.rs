//! Data structures shared by the board, the cache and the gateway.
//!
//! These are the rows stored by the hosted backend and mirrored on disk.
//! Times are kept as the strings the backend returns so that a blank or
//! malformed field degrades to a blank display instead of failing a fetch.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Prefix of identifiers given to rows that only exist in the local mirror.
pub const TEMPORARY_ID_PREFIX: &str = "local-";

/// ISO format of [`PrayerDay::date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day of prayer times.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrayerDay {
    /// Backend identifier, or a `local-` identifier for unsynced rows.
    #[serde(
        default,
        deserialize_with = "id_from_any",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Calendar day as `YYYY-MM-DD`, unique across rows.
    #[serde(deserialize_with = "blank_if_null")]
    pub date: String,
    /// Weekday name, e.g. `Friday`.
    #[serde(default, deserialize_with = "blank_if_null")]
    pub day: String,
    /// End of sehri, which is also the start of Fajr.
    #[serde(default, deserialize_with = "blank_if_null")]
    pub sehri_end: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub fajr_jamat: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub sunrise: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub zuhr_start: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub zuhr_jamat: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub asr_start: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub asr_jamat: String,
    /// Maghrib start, which is also iftar. Maghrib congregates at this time.
    #[serde(default, deserialize_with = "blank_if_null")]
    pub maghrib_iftar: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub isha_start: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub isha_first_jamat: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isha_second_jamat: Option<String>,
}

impl PrayerDay {
    /// Parses [`Self::date`], `None` when the row carries a malformed date.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()
    }

    /// Whether this row only exists in the local mirror.
    pub fn is_temporary(&self) -> bool {
        self.id
            .as_deref()
            .is_some_and(|id| id.starts_with(TEMPORARY_ID_PREFIX))
    }

    /// A copy without identifier, as sent on insert.
    pub fn without_id(&self) -> Self {
        PrayerDay {
            id: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for PrayerDay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "id={:?}, date={}, fajr={}, zuhr={}, asr={}, maghrib={}, isha={}",
            self.id,
            self.date,
            self.sehri_end,
            self.zuhr_start,
            self.asr_start,
            self.maghrib_iftar,
            self.isha_start
        )
    }
}

/// Weekday name used in the `day` column, e.g. `Friday`.
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Friday congregation override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JummahSetting {
    #[serde(deserialize_with = "blank_if_null")]
    pub first_jamat: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_jamat: Option<String>,
}

/// Free-floating hadith rotated on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HadithItem {
    #[serde(
        default,
        deserialize_with = "id_from_any",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub text: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub source: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Hadith bound to a day of the month, optionally to a single month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyHadith {
    #[serde(
        default,
        deserialize_with = "id_from_any",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub day_of_month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub text: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub source: String,
}

/// Hadith picked for display, whatever table it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HadithText {
    pub text: String,
    pub source: String,
}

/// Prayers and markers shown on the board, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Zuhr,
    Asr,
    Maghrib,
    Isha,
    Jummah,
}

impl PrayerName {
    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Zuhr => "Zuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
            PrayerName::Jummah => "Jummah",
        }
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Accepts `null` where a string is expected and turns it into `""`.
fn blank_if_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts numeric (`bigint`) and textual (`uuid`) identifiers alike.
fn id_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AnyId {
        Number(i64),
        Text(String),
    }

    Ok(
        Option::<AnyId>::deserialize(deserializer)?.map(|id| match id {
            AnyId::Number(n) => n.to_string(),
            AnyId::Text(s) => s,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_row() {
        let body = r#"{
            "id": 42,
            "date": "2024-06-14",
            "day": "Friday",
            "sehri_end": "03:10:00",
            "fajr_jamat": null,
            "sunrise": "04:45:00",
            "zuhr_start": "13:05:00",
            "zuhr_jamat": "13:30:00",
            "asr_start": "17:20:00",
            "asr_jamat": "18:00:00",
            "maghrib_iftar": "21:15:00",
            "isha_start": "22:40:00",
            "isha_first_jamat": "22:50:00",
            "isha_second_jamat": null
        }"#;

        let day: PrayerDay = serde_json::from_str(body).unwrap();
        assert_eq!(day.id.as_deref(), Some("42"));
        assert_eq!(day.fajr_jamat, "");
        assert_eq!(day.isha_second_jamat, None);
        assert!(!day.is_temporary());
    }

    #[test]
    fn test_deserialize_missing_columns() {
        let day: PrayerDay =
            serde_json::from_str(r#"{"id": "abc", "date": "2024-06-15"}"#).unwrap();
        assert_eq!(day.id.as_deref(), Some("abc"));
        assert_eq!(day.sehri_end, "");
        assert_eq!(
            day.calendar_date(),
            NaiveDate::from_ymd_opt(2024, 6, 15)
        );
    }

    #[test]
    fn test_insert_payload_has_no_id() {
        let day = PrayerDay {
            id: Some("local-1".to_owned()),
            date: "2024-06-15".to_owned(),
            ..Default::default()
        };
        assert!(day.is_temporary());

        let json = serde_json::to_value(day.without_id()).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["date"], "2024-06-15");
    }

    #[test]
    fn test_malformed_date() {
        let day = PrayerDay {
            date: "15/06/2024".to_owned(),
            ..Default::default()
        };
        assert_eq!(day.calendar_date(), None);
    }

    #[test]
    fn test_weekday_name() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        assert_eq!(weekday_name(date), "Friday");
    }

    #[test]
    fn test_hadith_active_defaults_to_true() {
        let item: HadithItem =
            serde_json::from_str(r#"{"id": 1, "text": "t", "source": null}"#).unwrap();
        assert!(item.active);
        assert_eq!(item.source, "");
    }
}
