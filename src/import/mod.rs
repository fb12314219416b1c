//! Bulk import of prayer timetables.
//!
//! Parsing is pure and never touches the backend; writing the parsed days is
//! an admin operation, see [`crate::admin::AdminSession::import_days`].

mod csv_import;
mod normalise;

pub use crate::import::csv_import::{ImportOptions, ParsedTimetable, parse_file};
