//! Cache layer between the board and the backend.
//!
//! # Modules
//!
//! - `clock` - Local wall clock, replaceable in tests
//! - `mirror` - JSON mirror of the last known data on disk
//! - `notify` - In-process change notices published by writes
//! - `prayer_cache` - The [`PrayerCache`] read/write facade
//! - `watcher` - Mirror file changes made by other processes

mod clock;
mod mirror;
mod notify;
mod prayer_cache;
mod watcher;

#[cfg(test)]
pub use crate::cache::clock::ManualClock;
pub use crate::cache::clock::{Clock, SystemClock, until_midnight, until_next_minute};
pub use crate::cache::mirror::MirrorStore;
pub use crate::cache::notify::{ChangeBus, DataSet};
pub use crate::cache::prayer_cache::{CacheSettings, PrayerCache, WriteOutcome};
pub use crate::cache::watcher::MirrorWatcher;
