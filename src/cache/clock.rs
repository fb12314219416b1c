//! Source of the local wall-clock time.
//!
//! Freshness, "today" and the alert minute are all derived from a [`Clock`]
//! so that tests can move time forward without sleeping.

use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};

/// Fallback delay when the next boundary cannot be computed.
const BOUNDARY_RETRY: Duration = Duration::from_secs(60);

/// Margin so that a wake-up lands past the boundary.
const BOUNDARY_MARGIN: Duration = Duration::from_secs(1);

/// Local wall-clock time, without timezone like the prayer times themselves.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// [`Clock`] reading the system time in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Time left until the next local midnight.
pub fn until_midnight(now: NaiveDateTime) -> Duration {
    now.date()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .and_then(|midnight| (midnight - now).to_std().ok())
        .filter(|left| !left.is_zero())
        .unwrap_or(BOUNDARY_RETRY)
        + BOUNDARY_MARGIN
}

/// Time left until the next minute starts.
pub fn until_next_minute(now: NaiveDateTime) -> Duration {
    let elapsed = Duration::new(u64::from(now.second()), now.nanosecond() % 1_000_000_000);
    BOUNDARY_RETRY.saturating_sub(elapsed)
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::Mutex;

    use chrono::{NaiveDateTime, TimeDelta};

    use super::Clock;

    /// Clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<NaiveDateTime>,
    }

    impl ManualClock {
        pub fn at(now: &str) -> Self {
            ManualClock {
                now: Mutex::new(
                    NaiveDateTime::parse_from_str(now, "%Y-%m-%d %H:%M").unwrap(),
                ),
            }
        }

        pub fn advance_minutes(&self, minutes: i64) {
            *self.now.lock().unwrap() += TimeDelta::minutes(minutes);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> NaiveDateTime {
            *self.now.lock().unwrap()
        }
    }
}
