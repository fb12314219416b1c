//! Alert scheduler firing jamat alerts at most once per minute.
//!
//! This module provides the [`AlertScheduler`] which owns the jamat table of
//! the current day, polls the clock and hands due alerts to a callback.

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use log::{debug, info};
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time,
};

use crate::{
    alerts::alert::{JamatEntry, PrayerAlert, Schedule, jamat_table},
    cache::{Clock, until_midnight},
    time_format::format_hhmm,
};

/// Mutable part of the scheduler, shared with its tasks.
#[derive(Default)]
struct SchedulerState {
    schedule: Option<Schedule>,
    table: Vec<JamatEntry>,
    /// Local date the table was built for
    table_date: Option<NaiveDate>,
    /// Alerts already fired since the last midnight
    fired: HashSet<PrayerAlert>,
    /// Minute handled by the last poll
    last_minute: Option<NaiveDateTime>,
}

impl SchedulerState {
    /// Replaces the schedule, the current minute is checked again.
    fn set_schedule(&mut self, schedule: Schedule, today: NaiveDate) {
        self.schedule = Some(schedule);
        self.rebuild(today);
    }

    fn rebuild(&mut self, today: NaiveDate) {
        let Some(schedule) = self.schedule.as_ref() else {
            return;
        };

        self.table = jamat_table(schedule, today);
        self.table_date = Some(today);
        self.last_minute = None;
        info!(
            "alert table for {} (day {}): {}",
            today,
            schedule.day.date,
            self.table
                .iter()
                .map(|entry| format!("{} {}", entry.prayer, entry.time))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    fn poll(&mut self, now: NaiveDateTime) -> Vec<PrayerAlert> {
        if self.table_date != Some(now.date()) {
            self.rebuild(now.date());
        }

        let minute = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        if self.last_minute == Some(minute) {
            return Vec::new();
        }
        self.last_minute = Some(minute);

        let hhmm = format_hhmm(now.time());
        let mut due = Vec::new();
        for entry in self.table.iter().filter(|entry| entry.time == hhmm) {
            let alert = PrayerAlert {
                prayer: entry.prayer,
                time: entry.time.clone(),
                date: now.date(),
            };
            if self.fired.insert(alert.clone()) {
                due.push(alert);
            }
        }

        due
    }

    fn reset(&mut self) {
        self.fired.clear();
        self.last_minute = None;
    }
}

/// Fires [`PrayerAlert`]s when the clock reaches a jamat time.
///
/// The scheduler owns its background tasks: [`AlertScheduler::stop`], or
/// dropping the scheduler, aborts them.
///
/// # Examples
///
/// ```no_run
/// let mut scheduler = AlertScheduler::new(Arc::new(SystemClock), Duration::from_secs(5));
/// scheduler.start(schedules, |alert| println!("{}", alert));
/// // ...
/// scheduler.stop();
/// ```
pub struct AlertScheduler {
    state: Arc<Mutex<SchedulerState>>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    handles: Vec<JoinHandle<()>>,
}

impl AlertScheduler {
    pub fn new(clock: Arc<dyn Clock>, poll_interval: Duration) -> Self {
        AlertScheduler {
            state: Arc::new(Mutex::new(SchedulerState::default())),
            clock,
            poll_interval,
            handles: Vec::new(),
        }
    }

    /// Starts the background tasks.
    ///
    /// # Arguments
    ///
    /// * `schedules` - Receives the day to announce, the table is rebuilt on every change.
    /// * `on_alert` - Called for every due alert.
    pub fn start<F>(&mut self, mut schedules: watch::Receiver<Option<Schedule>>, on_alert: F)
    where
        F: Fn(PrayerAlert) + Send + Sync + 'static,
    {
        self.stop();

        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let table_handle = tokio::spawn(async move {
            loop {
                let schedule = schedules.borrow_and_update().clone();
                if let Some(schedule) = schedule {
                    debug!("new schedule for {}", schedule.day.date);
                    state
                        .lock()
                        .await
                        .set_schedule(schedule, clock.now().date());
                }
                if schedules.changed().await.is_err() {
                    debug!("schedule sender dropped, keeping the last table");
                    return;
                }
            }
        });

        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let poll_interval = self.poll_interval;
        let poll_handle = tokio::spawn(async move {
            let mut interval = time::interval(poll_interval);
            loop {
                interval.tick().await;
                let due = state.lock().await.poll(clock.now());
                for alert in due {
                    info!("firing {}", alert);
                    on_alert(alert);
                }
            }
        });

        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let midnight_handle = tokio::spawn(async move {
            loop {
                time::sleep(until_midnight(clock.now())).await;
                state.lock().await.reset();
                info!("midnight reached, alert history cleared");
            }
        });

        self.handles = vec![table_handle, poll_handle, midnight_handle];
    }

    /// Aborts the background tasks, the scheduler can be started again.
    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for AlertScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
