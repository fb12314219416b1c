//! Parsing of prayer timetables exported as CSV.

use std::{io::Read, path::Path};

use log::{debug, warn};
use tokio::fs;

use crate::{
    error::BoardError,
    import::normalise::{normalise_date, normalise_time},
    prayers::{PrayerDay, weekday_name},
};

/// Rows shorter than this cannot hold a usable day.
const MIN_COLUMNS: usize = 5;

/// Options of a bulk import.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Treat the first row as a header even when it holds a date
    pub header: bool,
    /// Delete every stored day before inserting
    pub replace: bool,
    /// Parse and report without writing
    pub dry_run: bool,
}

/// Outcome of parsing a timetable.
#[derive(Debug, Default)]
pub struct ParsedTimetable {
    pub days: Vec<PrayerDay>,
    /// Number of rows ignored
    pub skipped: usize,
    pub warnings: Vec<String>,
}

impl ParsedTimetable {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Parses the timetable file at `path`.
pub async fn parse_file(path: &Path, force_header: bool) -> Result<ParsedTimetable, BoardError> {
    let content = fs::read(path)
        .await
        .map_err(|e| BoardError::Import(format!("cannot read {}: {}", path.display(), e)))?;
    parse_timetable(content.as_slice(), force_header)
}

/// Parses a timetable, one prayer day per row.
///
/// Columns are positional: date, day, sehri end, fajr jamat, sunrise, zuhr
/// start, zuhr jamat, asr start, asr jamat, maghrib, isha start, isha first
/// jamat and isha second jamat. Values that cannot be normalised are kept
/// as written and reported in the warnings.
pub fn parse_timetable<R: Read>(
    reader: R,
    force_header: bool,
) -> Result<ParsedTimetable, BoardError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut parsed = ParsedTimetable::default();

    for (index, record) in reader.records().enumerate() {
        let line = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                parsed.skipped += 1;
                parsed.warn(format!("row {}: unreadable, skipped: {}", line, e));
                continue;
            }
        };
        let cells: Vec<&str> = record.iter().collect();

        if index == 0 && (force_header || normalise_date(cells.first().unwrap_or(&"")).is_none()) {
            debug!("skipping header row {:?}", cells);
            continue;
        }

        if cells.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        if cells.len() < MIN_COLUMNS {
            parsed.skipped += 1;
            parsed.warn(format!(
                "row {}: only {} columns, skipped",
                line,
                cells.len()
            ));
            continue;
        }

        let day = parse_row(line, &cells, &mut parsed);
        parsed.days.push(day);
    }

    Ok(parsed)
}

fn parse_row(line: usize, cells: &[&str], parsed: &mut ParsedTimetable) -> PrayerDay {
    let cell = |column: usize| cells.get(column).copied().unwrap_or("");

    let raw_date = cell(0);
    let date = match normalise_date(raw_date) {
        Some(date) => date,
        None => {
            parsed.warn(format!("row {}: unrecognised date {:?}", line, raw_date));
            raw_date.to_owned()
        }
    };

    let mut time = |column: usize, name: &str| -> String {
        let raw = cell(column);
        if raw.is_empty() {
            return String::new();
        }
        normalise_time(raw).unwrap_or_else(|| {
            parsed.warn(format!("row {}: unrecognised {} time {:?}", line, name, raw));
            raw.to_owned()
        })
    };

    let mut day = PrayerDay {
        id: None,
        date,
        day: cell(1).to_owned(),
        sehri_end: time(2, "sehri"),
        fajr_jamat: time(3, "fajr jamat"),
        sunrise: time(4, "sunrise"),
        zuhr_start: time(5, "zuhr"),
        zuhr_jamat: time(6, "zuhr jamat"),
        asr_start: time(7, "asr"),
        asr_jamat: time(8, "asr jamat"),
        maghrib_iftar: time(9, "maghrib"),
        isha_start: time(10, "isha"),
        isha_first_jamat: time(11, "isha jamat"),
        isha_second_jamat: Some(time(12, "isha second jamat")).filter(|t| !t.is_empty()),
    };

    if day.day.is_empty() {
        if let Some(date) = day.calendar_date() {
            day.day = weekday_name(date);
        }
    }

    day
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TIMETABLE: &str = "\
Date,Day,Sehri,Fajr,Sunrise,Zuhr,Zuhr Jamat,Asr,Asr Jamat,Maghrib,Isha,Isha Jamat,Isha 2
15/06/2024,,3.10,0400,4:45,13:05,1.30 pm,17:20,18:00,21:15,22:40,22:50,
16/06/2024,Sunday,3:10
17/06/2024,Monday,3:11,4:00,4:45,13:05,13:30,17:20,18:00,21:16,22:41,22:50,23:15
";

    #[test]
    fn test_parse_timetable() {
        let parsed = parse_timetable(TIMETABLE.as_bytes(), false).unwrap();

        assert_eq!(parsed.days.len(), 2);
        assert_eq!(parsed.skipped, 1);

        let first = &parsed.days[0];
        assert_eq!(first.date, "2024-06-15");
        assert_eq!(first.day, "Saturday");
        assert_eq!(first.sehri_end, "03:10");
        assert_eq!(first.fajr_jamat, "04:00");
        assert_eq!(first.zuhr_jamat, "13:30");
        assert_eq!(first.isha_second_jamat, None);

        assert_eq!(parsed.days[1].isha_second_jamat.as_deref(), Some("23:15"));
    }

    #[test]
    fn test_short_row_is_skipped() {
        let parsed = parse_timetable("2024-06-15,Saturday,03:10\n".as_bytes(), false).unwrap();

        assert!(parsed.days.is_empty());
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_forced_header_skips_first_row() {
        let rows = "2024-06-14,Friday,03:10,04:00,04:45\n2024-06-15,Saturday,03:10,04:00,04:45\n";

        assert_eq!(parse_timetable(rows.as_bytes(), false).unwrap().days.len(), 2);

        let parsed = parse_timetable(rows.as_bytes(), true).unwrap();
        assert_eq!(parsed.days.len(), 1);
        assert_eq!(parsed.days[0].date, "2024-06-15");
    }

    #[test]
    fn test_unparseable_values_pass_through() {
        let rows = "2024-06-15,Saturday,03:10,soon,04:45\n";
        let parsed = parse_timetable(rows.as_bytes(), false).unwrap();

        assert_eq!(parsed.days[0].fajr_jamat, "soon");
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_parse_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TIMETABLE.as_bytes()).unwrap();

        assert_eq!(parse_file(file.path(), false).await.unwrap().days.len(), 2);
        assert!(matches!(
            parse_file(Path::new("no-such-timetable.csv"), false).await,
            Err(BoardError::Import(_))
        ));
    }
}
