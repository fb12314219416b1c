//! Derivation of the "active" and "next" prayers from the wall clock.
//!
//! The board shows one row per prayer and highlights the prayer whose window
//! contains the current time (active) and the first prayer still to come
//! (next). Both are recomputed from scratch on every evaluation from a single
//! `now` and a single [`PrayerDay`] snapshot.

use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::Serialize;

use crate::{
    prayers::structs::{JummahSetting, PrayerDay, PrayerName},
    time_format::{format_hhmm, is_before, minutes_of, to_12h, to_minutes},
};

/// Length of the Maghrib window in minutes.
const MAGHRIB_WINDOW_MINUTES: u32 = 60;
const MINUTES_PER_DAY: u32 = 24 * 60;
const NOON: u32 = 12 * 60;

/// One row of the board, derived and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayPrayerEntry {
    pub name: PrayerName,
    /// Start time in 12h form, blank when unknown.
    pub time: String,
    /// Congregation time in 12h form.
    pub jamat: Option<String>,
    pub active: bool,
    pub next: bool,
}

/// Builds the board rows for `day` at `now`.
///
/// Rows come in canonical order: Fajr, Sunrise, Zuhr, Asr, Maghrib, Isha,
/// then Jummah when `now` falls on a Friday. Jummah mirrors Zuhr's flags and
/// shows the override times from `jummah`, or the Zuhr jamat without one.
pub fn evaluate(
    day: &PrayerDay,
    jummah: Option<&JummahSetting>,
    now: NaiveDateTime,
) -> Vec<DisplayPrayerEntry> {
    let active = active_prayer(day, minutes_of(now.time()));
    let next = next_prayer(day, &format_hhmm(now.time()));

    let row = |name: PrayerName, time: &str, jamat: Option<&str>| DisplayPrayerEntry {
        name,
        time: to_12h(time),
        jamat: jamat.map(to_12h).filter(|j| !j.is_empty()),
        active: active == Some(name),
        next: next == name,
    };

    let mut entries = vec![
        row(PrayerName::Fajr, &day.sehri_end, Some(&day.fajr_jamat)),
        row(PrayerName::Sunrise, &day.sunrise, None),
        row(PrayerName::Zuhr, &day.zuhr_start, Some(&day.zuhr_jamat)),
        row(PrayerName::Asr, &day.asr_start, Some(&day.asr_jamat)),
        row(
            PrayerName::Maghrib,
            &day.maghrib_iftar,
            Some(&day.maghrib_iftar),
        ),
        row(PrayerName::Isha, &day.isha_start, Some(&day.isha_first_jamat)),
    ];

    if now.date().weekday() == Weekday::Fri {
        let (first, second) = jummah_times(day, jummah);
        entries.push(DisplayPrayerEntry {
            name: PrayerName::Jummah,
            time: to_12h(&first),
            jamat: second.as_deref().map(to_12h).filter(|j| !j.is_empty()),
            active: active == Some(PrayerName::Zuhr),
            next: next == PrayerName::Zuhr,
        });
    }

    entries
}

/// Jummah congregation times: the override when present, else Zuhr jamat.
pub fn jummah_times(day: &PrayerDay, jummah: Option<&JummahSetting>) -> (String, Option<String>) {
    match jummah {
        Some(setting) if !setting.first_jamat.trim().is_empty() => (
            setting.first_jamat.clone(),
            setting
                .second_jamat
                .clone()
                .filter(|second| !second.trim().is_empty()),
        ),
        _ => (day.zuhr_jamat.clone(), None),
    }
}

/// The prayer whose window contains `now_minutes`.
///
/// Windows are checked in canonical order and the last match wins, so
/// malformed rows with overlapping windows still yield a single prayer.
pub fn active_prayer(day: &PrayerDay, now_minutes: u32) -> Option<PrayerName> {
    let fajr = to_minutes(&day.sehri_end);
    let sunrise = to_minutes(&day.sunrise);
    let zuhr = to_minutes(&day.zuhr_start);
    let asr = to_minutes(&day.asr_start);
    let asr_end_of_zuhr = asr.or_else(|| to_minutes(&day.asr_jamat));
    let maghrib = to_minutes(&day.maghrib_iftar);
    let isha = to_minutes(&day.isha_start);

    let mut active = None;

    if within(now_minutes, fajr, sunrise) {
        active = Some(PrayerName::Fajr);
    }
    if within(now_minutes, zuhr, asr_end_of_zuhr) {
        active = Some(PrayerName::Zuhr);
    }
    if within(now_minutes, asr, maghrib) {
        active = Some(PrayerName::Asr);
    }
    if let Some(start) = maghrib {
        let end = start + MAGHRIB_WINDOW_MINUTES;
        let in_window = if end < MINUTES_PER_DAY {
            start <= now_minutes && now_minutes < end
        } else {
            now_minutes >= start || now_minutes < end - MINUTES_PER_DAY
        };
        if in_window {
            active = Some(PrayerName::Maghrib);
        }
    }
    if let Some(start) = isha {
        // Isha runs past midnight until the next Fajr
        let after_midnight = now_minutes < NOON && fajr.is_some_and(|f| now_minutes < f);
        if now_minutes >= start || after_midnight {
            active = Some(PrayerName::Isha);
        }
    }

    active
}

/// The first prayer still ahead of `now`; Fajr once Isha started.
///
/// `now` and the day's times may be in either 12h or 24h form.
pub fn next_prayer(day: &PrayerDay, now: &str) -> PrayerName {
    [
        (PrayerName::Fajr, &day.sehri_end),
        (PrayerName::Zuhr, &day.zuhr_start),
        (PrayerName::Asr, &day.asr_start),
        (PrayerName::Maghrib, &day.maghrib_iftar),
        (PrayerName::Isha, &day.isha_start),
    ]
    .into_iter()
    .find(|(_, time)| is_before(now, time))
    .map(|(name, _)| name)
    .unwrap_or(PrayerName::Fajr)
}

fn within(now: u32, start: Option<u32>, end: Option<u32>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => start <= now && now < end,
        _ => false,
    }
}
