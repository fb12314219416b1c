//! Minbar - A prayer times board for mosques.
//!
//! This is the main entry point for minbar, which shows the daily prayer
//! times of a mosque from a hosted backend and announces every jamat.
//!
//! # Overview
//!
//! Minbar keeps a local mirror of the prayer timetable stored in a Supabase
//! project, so the board keeps working when the network does not. Admins
//! manage the timetable, the Jummah times and the hadiths from the same
//! binary.
//!
//! # Features
//!
//! - **Prayer Board**: Begin and jamat times with the active and next prayer highlighted
//! - **Friday Jummah**: Jummah row with configurable first and second jamat
//! - **Daily Hadith**: Calendar hadith of the day, or one from the collection
//! - **Jamat Alerts**: Runs a command (e.g. an adhan player) at every jamat
//! - **Offline Mirror**: Last known data on disk, built-in defaults as last resort
//! - **CSV Import**: Bulk import of spreadsheet timetables with lenient formats
//!
//! # Configuration
//!
//! Create a `config.yaml` file, see [`config`] for every key:
//!
//! ```yaml
//! backend:
//!   url: "https://project.supabase.co"
//!   api_key: "anon-key"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Override any configuration value using environment variables with the `MINBAR_` prefix:
//!
//! ```bash
//! export MINBAR_BACKEND__ACCESS_TOKEN="user-jwt"
//! export MINBAR_BACKEND__USER_ID="uuid-of-admin"
//! ```
//!
//! # Usage
//!
//! ```bash
//! minbar --config config.yaml --data ./minbar-data              # run the board
//! minbar --config config.yaml --data ./minbar-data today        # print today's board
//! minbar --config config.yaml --data ./minbar-data import times.csv --replace
//! minbar --config config.yaml --data ./minbar-data jummah 13:30 14:15
//! minbar --config config.yaml --data ./minbar-data day add 2024-06-15 --sehri-end 03:10 --fajr-jamat 04:00
//! minbar --config config.yaml --data ./minbar-data hadith add "The best of you..." --source Bukhari
//! ```
//!
//! Admin commands given the same `--data` directory as a running board are
//! picked up by that board at once, others at its next polling interval.
//!
//! # Architecture
//!
//! - [`admin`] - Authenticated and validated writes
//! - [`alerts`] - Jamat alert scheduling and playback
//! - [`board`] - Long running board tasks
//! - [`cache`] - Mirror, freshness and change notices in front of the backend
//! - [`config`] - YAML configuration with environment variable support
//! - [`gateway`] - Backend repository trait and its REST implementation
//! - [`import`] - CSV timetable parsing
//! - [`prayers`] - Prayer data and active/next derivation
//! - [`render`] - Plain text output
//! - [`time_format`] - 12h/24h time conversions
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};

use crate::{
    admin::{AdminSession, ImportReport},
    board::{Board, open_cache, refresh},
    cache::{ChangeBus, Clock, PrayerCache, SystemClock},
    config::Config,
    error::BoardError,
    gateway::Gateway,
    import::ImportOptions,
    prayers::{DailyHadith, HadithItem, JummahSetting, PrayerDay, evaluate, weekday_name},
    render::{
        format_board, format_daily_hadith, format_days, format_error, format_hadith_item,
        format_import_report, format_jummah, format_write_outcome,
    },
};

mod admin;
mod alerts;
mod board;
mod cache;
mod config;
mod error;
mod gateway;
mod import;
mod prayers;
mod render;
mod time_format;
mod utils;

/// Command-line arguments of minbar.
///
/// # Examples
///
/// ```bash
/// minbar --config config.yaml --data ./minbar-data
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: String,

    /// Directory holding the local mirror of the prayer times.
    #[arg(short, long)]
    data: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the board until interrupted (default)
    Serve,
    /// Print today's board once
    Today,
    /// List the prayer days between two dates, inclusive
    Days { from: NaiveDate, to: NaiveDate },
    /// Add, update or delete one prayer day (admin)
    Day {
        #[command(subcommand)]
        action: DayAction,
    },
    /// Import prayer days from a CSV timetable (admin)
    Import {
        file: PathBuf,
        /// Delete every stored day first
        #[arg(long)]
        replace: bool,
        /// Only print what would be imported
        #[arg(long)]
        dry_run: bool,
        /// The first row is a header
        #[arg(long)]
        header: bool,
    },
    /// Set the Jummah jamat times (admin)
    Jummah { first: String, second: Option<String> },
    /// Manage the hadith collection (admin)
    Hadith {
        #[command(subcommand)]
        action: HadithAction,
    },
    /// Manage the hadiths bound to a day of the month (admin)
    DailyHadith {
        #[command(subcommand)]
        action: DailyHadithAction,
    },
    /// Delete every prayer day (admin)
    Clear,
    /// Ask every board to reload (admin)
    Reload,
    /// Remove the local mirror, the next read refetches everything
    Forget,
}

#[derive(Subcommand, Debug)]
enum DayAction {
    Add(DayArgs),
    /// Update a day by id, a `local-` id is synced to the backend
    Update {
        id: String,
        #[command(flatten)]
        day: DayArgs,
    },
    Delete { id: String },
}

/// Times of one prayer day, 12h or 24h.
#[derive(clap::Args, Debug)]
struct DayArgs {
    /// Date as YYYY-MM-DD
    date: String,
    #[arg(long)]
    sehri_end: String,
    #[arg(long, default_value = "")]
    fajr_jamat: String,
    #[arg(long, default_value = "")]
    sunrise: String,
    #[arg(long, default_value = "")]
    zuhr_start: String,
    #[arg(long, default_value = "")]
    zuhr_jamat: String,
    #[arg(long, default_value = "")]
    asr_start: String,
    #[arg(long, default_value = "")]
    asr_jamat: String,
    #[arg(long, default_value = "")]
    maghrib: String,
    #[arg(long, default_value = "")]
    isha_start: String,
    #[arg(long, default_value = "")]
    isha_first_jamat: String,
    #[arg(long)]
    isha_second_jamat: Option<String>,
}

impl From<DayArgs> for PrayerDay {
    fn from(args: DayArgs) -> Self {
        let day = NaiveDate::parse_from_str(args.date.trim(), prayers::DATE_FORMAT)
            .map(weekday_name)
            .unwrap_or_default();

        PrayerDay {
            id: None,
            date: args.date,
            day,
            sehri_end: args.sehri_end,
            fajr_jamat: args.fajr_jamat,
            sunrise: args.sunrise,
            zuhr_start: args.zuhr_start,
            zuhr_jamat: args.zuhr_jamat,
            asr_start: args.asr_start,
            asr_jamat: args.asr_jamat,
            maghrib_iftar: args.maghrib,
            isha_start: args.isha_start,
            isha_first_jamat: args.isha_first_jamat,
            isha_second_jamat: args.isha_second_jamat,
        }
    }
}

#[derive(Subcommand, Debug)]
enum HadithAction {
    Add(HadithArgs),
    Update {
        id: String,
        #[command(flatten)]
        hadith: HadithArgs,
    },
    Delete { id: String },
}

#[derive(clap::Args, Debug)]
struct HadithArgs {
    text: String,
    #[arg(long, default_value = "")]
    source: String,
    /// Keep the hadith out of the rotation
    #[arg(long)]
    inactive: bool,
}

impl From<HadithArgs> for HadithItem {
    fn from(args: HadithArgs) -> Self {
        HadithItem {
            id: None,
            text: args.text,
            source: args.source,
            active: !args.inactive,
        }
    }
}

#[derive(Subcommand, Debug)]
enum DailyHadithAction {
    Add(DailyHadithArgs),
    Update {
        id: String,
        #[command(flatten)]
        hadith: DailyHadithArgs,
    },
    Delete { id: String },
}

#[derive(clap::Args, Debug)]
struct DailyHadithArgs {
    /// Day of the month, 1 to 31
    day_of_month: u32,
    text: String,
    /// Restrict the hadith to one month, 1 to 12
    #[arg(long)]
    month: Option<u32>,
    #[arg(long, default_value = "")]
    source: String,
}

impl From<DailyHadithArgs> for DailyHadith {
    fn from(args: DailyHadithArgs) -> Self {
        DailyHadith {
            id: None,
            day_of_month: args.day_of_month,
            month: args.month,
            text: args.text,
            source: args.source,
        }
    }
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting minbar {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    let command = args.command.unwrap_or(Command::Serve);
    if let Command::Serve = command {
        match Board::new(&config, &args.data).await {
            Ok(board) => board.start().await,
            Err(e) => error!("Failed to initialize board: {}", e),
        }
        return;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut cache = match open_cache(&config, &args.data, ChangeBus::new(8), Arc::clone(&clock)).await
    {
        Ok(cache) => cache,
        Err(e) => {
            error!("Failed to open prayer cache: {}", e);
            return;
        }
    };

    let user_id = config.backend.user_id.as_deref();
    match run(command, user_id, &mut cache, clock.as_ref()).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("{}", e);
            println!("{}", format_error(&e.to_string()));
            std::process::exit(1);
        }
    }
}

/// Runs a one-shot command, returns the text to print.
async fn run<G: Gateway>(
    command: Command,
    user_id: Option<&str>,
    cache: &mut PrayerCache<G>,
    clock: &dyn Clock,
) -> Result<String, BoardError> {
    let output = match command {
        Command::Serve => String::new(),
        Command::Today => {
            let view = refresh(cache, false).await;
            let now = clock.now();
            let entries = evaluate(&view.schedule.day, view.schedule.jummah.as_ref(), now);
            format_board(&entries, &view.hadith, now)
        }
        Command::Days { from, to } => format_days(&cache.days_between(from, to).await),
        Command::Day { action } => {
            let mut session = AdminSession::login(cache, user_id).await?;
            match action {
                DayAction::Add(day) => format_write_outcome(&session.add_day(day.into()).await?),
                DayAction::Update { id, day } => {
                    format_write_outcome(&session.update_day(&id, day.into()).await?)
                }
                DayAction::Delete { id } => {
                    session.delete_day(&id).await?;
                    format!("Deleted prayer day {}.", id)
                }
            }
        }
        Command::Import {
            file,
            replace,
            dry_run,
            header,
        } => {
            let options = ImportOptions {
                header,
                replace,
                dry_run,
            };
            let report = import_timetable(cache, user_id, &file, options).await?;
            format_import_report(&report, dry_run)
        }
        Command::Jummah { first, second } => {
            let mut session = AdminSession::login(cache, user_id).await?;
            let stored = session
                .set_jummah(JummahSetting {
                    first_jamat: first,
                    second_jamat: second,
                })
                .await?;
            format_jummah(&stored)
        }
        Command::Hadith { action } => {
            let mut session = AdminSession::login(cache, user_id).await?;
            match action {
                HadithAction::Add(hadith) => {
                    format_hadith_item(&session.add_hadith(hadith.into()).await?)
                }
                HadithAction::Update { id, hadith } => {
                    format_hadith_item(&session.update_hadith(&id, hadith.into()).await?)
                }
                HadithAction::Delete { id } => {
                    session.delete_hadith(&id).await?;
                    format!("Deleted hadith {}.", id)
                }
            }
        }
        Command::DailyHadith { action } => {
            let mut session = AdminSession::login(cache, user_id).await?;
            match action {
                DailyHadithAction::Add(hadith) => {
                    format_daily_hadith(&session.add_daily_hadith(hadith.into()).await?)
                }
                DailyHadithAction::Update { id, hadith } => format_daily_hadith(
                    &session.update_daily_hadith(&id, hadith.into()).await?,
                ),
                DailyHadithAction::Delete { id } => {
                    session.delete_daily_hadith(&id).await?;
                    format!("Deleted daily hadith {}.", id)
                }
            }
        }
        Command::Clear => {
            AdminSession::login(cache, user_id)
                .await?
                .delete_all_days()
                .await?;
            "Every prayer day was deleted.".to_owned()
        }
        Command::Reload => {
            AdminSession::login(cache, user_id)
                .await?
                .broadcast_reload()
                .await?;
            "Reload signal sent.".to_owned()
        }
        Command::Forget => {
            cache.clear().await;
            "Local mirror removed.".to_owned()
        }
    };

    Ok(output)
}

async fn import_timetable<G: Gateway>(
    cache: &mut PrayerCache<G>,
    user_id: Option<&str>,
    file: &Path,
    options: ImportOptions,
) -> Result<ImportReport, BoardError> {
    // A dry run only parses, no session needed
    if options.dry_run {
        let parsed = import::parse_file(file, options.header).await?;
        return Ok(ImportReport {
            parsed,
            inserted: 0,
        });
    }

    let mut session = AdminSession::login(cache, user_id).await?;
    session.import_days(file, options).await
}
