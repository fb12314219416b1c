//! Prayer times domain: data model, state derivation and daily content.
//!
//! # Modules
//!
//! - `structs` - Prayer days, Jummah override and hadith rows
//! - `state` - Active and next prayer derivation for the board
//! - `hadith` - Daily hadith precedence rules
//! - `defaults` - Built-in values used when no data is reachable

mod defaults;
mod hadith;
mod state;
mod structs;

pub use crate::prayers::defaults::default_day;
pub use crate::prayers::hadith::select_daily;
pub use crate::prayers::state::{DisplayPrayerEntry, evaluate, jummah_times};
pub use crate::prayers::structs::{
    DATE_FORMAT, DailyHadith, HadithItem, HadithText, JummahSetting, PrayerDay, PrayerName,
    TEMPORARY_ID_PREFIX, weekday_name,
};
