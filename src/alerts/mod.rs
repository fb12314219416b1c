//! Jamat alerts.
//!
//! The board announces every congregation time of the day exactly once:
//!
//! - `PrayerAlert`: A due alert, also its own key in the fired history
//! - [`AlertScheduler`]: Owns the jamat table and fires alerts from the clock
//! - [`AlertPlayer`]: Plays an alert through an external command with retries
//!
//! # Architecture
//!
//! The scheduler receives the current [`Schedule`] on a watch channel and
//! rebuilds its table on every change and whenever the local date changes,
//! since Jummah replaces Zuhr only when today is a Friday. A poll task checks
//! the clock every few seconds and handles each minute once; a midnight task
//! clears the history of fired alerts so the next day starts fresh.
//!
//! # Example Usage
//!
//! ```no_run
//! let (schedules_tx, schedules_rx) = watch::channel(None);
//! let mut scheduler = AlertScheduler::new(Arc::new(SystemClock), Duration::from_secs(5));
//! let player = AlertPlayer::new(vec!["aplay".into(), "adhan.wav".into()], 3, Duration::from_secs(2));
//!
//! scheduler.start(schedules_rx, move |alert| {
//!     let player = player.clone();
//!     tokio::spawn(async move { player.play(&alert).await });
//! });
//! schedules_tx.send(Some(Schedule { day, jummah: None }))?;
//! ```

mod alert;
mod alert_scheduler;
mod player;

pub use crate::alerts::alert::Schedule;
pub use crate::alerts::alert_scheduler::AlertScheduler;
pub use crate::alerts::player::AlertPlayer;
