//! Request and response structures specific to the REST backend.
//!
//! Domain rows shared with the rest of the board live in
//! [`crate::prayers`]; this module only holds what the wire needs on top.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::prayers::{DATE_FORMAT, JummahSetting};

/// Backend tables the board reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    PrayerTimes,
    Hadiths,
    DailyHadiths,
    JummahSettings,
    Profiles,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::PrayerTimes => "prayer_times",
            Table::Hadiths => "hadiths",
            Table::DailyHadiths => "daily_hadiths",
            Table::JummahSettings => "jummah_settings",
            Table::Profiles => "profiles",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Date restriction applied when listing prayer days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFilter {
    All,
    On(NaiveDate),
    /// Days on or after the date.
    From(NaiveDate),
    /// Days between both dates, inclusive.
    Between(NaiveDate, NaiveDate),
}

impl DayFilter {
    /// PostgREST query parameters for this filter, ordered by date.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let fmt = |date: &NaiveDate| date.format(DATE_FORMAT).to_string();
        let mut query = vec![("select", "*".to_owned()), ("order", "date.asc".to_owned())];

        match self {
            DayFilter::All => {}
            DayFilter::On(date) => query.push(("date", format!("eq.{}", fmt(date)))),
            DayFilter::From(date) => query.push(("date", format!("gte.{}", fmt(date)))),
            DayFilter::Between(from, to) => {
                query.push(("date", format!("gte.{}", fmt(from))));
                query.push(("date", format!("lte.{}", fmt(to))));
            }
        }

        query
    }
}

/// Kind of mutation observed on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Notification emitted on the gateway change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    Row { table: Table, kind: ChangeKind },
    /// Every client should reload everything.
    Reload,
}

/// Row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

/// Identifier of the single `jummah_settings` row.
pub const JUMMAH_ROW_ID: i64 = 1;

/// Upsert payload for the `jummah_settings` singleton.
#[derive(Debug, Serialize)]
pub struct JummahRow<'a> {
    pub id: i64,
    #[serde(flatten)]
    pub setting: &'a JummahSetting,
}

/// Body of `/realtime/v1/api/broadcast`.
#[derive(Debug, Serialize)]
pub struct BroadcastBody {
    pub messages: Vec<BroadcastMessage>,
}

#[derive(Debug, Serialize)]
pub struct BroadcastMessage {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
}
