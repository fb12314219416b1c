//! Plain text formatters for the board and the admin commands.
//!
//! This module turns board state and command results into the text written
//! to stdout. Nothing here decides anything: the rows come from
//! [`crate::prayers::evaluate`].

use chrono::NaiveDateTime;

use crate::{
    admin::ImportReport,
    cache::WriteOutcome,
    prayers::{DailyHadith, DisplayPrayerEntry, HadithItem, HadithText, JummahSetting, PrayerDay},
};

/// Shown under the prayer table at all times.
pub const PHONE_REMINDER: &str = "Please switch off your mobile phone before entering the prayer hall.";

const RULE: &str = "----------------------------------------";

/// Renders the full board.
///
/// Active prayer is marked with `>`, the next one with `*`.
///
/// # Examples
///
/// ```text
/// Saturday 15 June 2024                 9:41 AM
/// ----------------------------------------
///   Prayer     Begins      Jamat
/// > Fajr       3:10 AM     4:00 AM
/// * Sunrise    4:45 AM
/// ```
pub fn format_board(
    entries: &[DisplayPrayerEntry],
    hadith: &HadithText,
    now: NaiveDateTime,
) -> String {
    let mut lines = vec![
        format!(
            "{:<30}{:>10}",
            now.format("%A %-d %B %Y").to_string(),
            now.format("%-I:%M %p").to_string()
        ),
        RULE.to_owned(),
        format!("  {:<11}{:<12}{}", "Prayer", "Begins", "Jamat"),
    ];

    lines.extend(entries.iter().map(format_entry));
    lines.push(RULE.to_owned());
    lines.push(PHONE_REMINDER.to_owned());
    lines.push(String::new());
    lines.push(format_hadith(hadith));

    lines.join("\n")
}

fn format_entry(entry: &DisplayPrayerEntry) -> String {
    let marker = match (entry.active, entry.next) {
        (true, _) => '>',
        (false, true) => '*',
        _ => ' ',
    };
    let time = if entry.time.is_empty() { "--" } else { entry.time.as_str() };

    format!(
        "{} {:<11}{:<12}{}",
        marker,
        entry.name.to_string(),
        time,
        entry.jamat.as_deref().unwrap_or("")
    )
    .trim_end()
    .to_owned()
}

pub fn format_hadith(hadith: &HadithText) -> String {
    if hadith.source.is_empty() {
        return format!("\"{}\"", hadith.text);
    }
    format!("\"{}\"\n  - {}", hadith.text, hadith.source)
}

pub fn format_write_outcome(outcome: &WriteOutcome) -> String {
    match outcome {
        WriteOutcome::Synced(day) => format!(
            "Saved prayer day {} ({}).",
            day.date,
            day.id.as_deref().unwrap_or("no id")
        ),
        WriteOutcome::LocalOnly(day) => format!(
            "Backend unreachable: prayer day {} kept locally, it will be synced on its next update.",
            day.date
        ),
    }
}

/// One line per day, as listed by the `days` command.
pub fn format_days(days: &[PrayerDay]) -> String {
    if days.is_empty() {
        return "No prayer days in this range.".to_owned();
    }
    days.iter()
        .map(|day| format!("- {}", day))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_hadith_item(hadith: &HadithItem) -> String {
    format!(
        "Saved hadith {}{}:\n{}",
        hadith.id.as_deref().unwrap_or("without id"),
        if hadith.active { "" } else { " (inactive)" },
        format_hadith(&HadithText {
            text: hadith.text.clone(),
            source: hadith.source.clone(),
        })
    )
}

pub fn format_daily_hadith(hadith: &DailyHadith) -> String {
    let when = match hadith.month {
        Some(month) => format!("day {} of month {}", hadith.day_of_month, month),
        None => format!("day {} of every month", hadith.day_of_month),
    };
    format!(
        "Saved daily hadith {} for {}.",
        hadith.id.as_deref().unwrap_or("without id"),
        when
    )
}

pub fn format_import_report(report: &ImportReport, dry_run: bool) -> String {
    let mut lines = Vec::new();

    if dry_run {
        lines.push(format!(
            "Dry run: {} prayer days parsed, {} rows skipped.",
            report.parsed.days.len(),
            report.parsed.skipped
        ));
        lines.extend(report.parsed.days.iter().map(|day| format!("- {}", day)));
    } else {
        lines.push(format!(
            "Imported {} prayer days, {} rows skipped.",
            report.inserted, report.parsed.skipped
        ));
    }

    if !report.parsed.warnings.is_empty() {
        lines.push("Warnings:".to_owned());
        lines.extend(report.parsed.warnings.iter().map(|w| format!("- {}", w)));
    }

    lines.join("\n")
}

pub fn format_jummah(setting: &JummahSetting) -> String {
    match setting.second_jamat.as_deref().filter(|s| !s.is_empty()) {
        Some(second) => format!(
            "Jummah jamats set to {} and {}.",
            setting.first_jamat, second
        ),
        None => format!("Jummah jamat set to {}.", setting.first_jamat),
    }
}

pub fn format_error(reason: &str) -> String {
    format!("Error: {}", reason)
}
