//! Local mirror persistence.
//!
//! This module provides the [`MirrorStore`] keeping the last known prayer
//! days and Jummah setting on disk, so the board can start and keep showing
//! times while the backend is unreachable.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::prayers::{JummahSetting, PrayerDay};

/// Everything persisted in the mirror file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    /// Prayer days ordered by date, temporary records included
    #[serde(default)]
    pub days: Vec<PrayerDay>,
    /// When `days` was last filled from the backend
    #[serde(default)]
    pub last_refreshed: Option<NaiveDateTime>,
    #[serde(default)]
    pub jummah: Option<JummahSetting>,
    #[serde(default)]
    pub jummah_refreshed: Option<NaiveDateTime>,
    /// Last write that is not mirrored (hadiths, reload requests)
    #[serde(default)]
    pub touched: Option<NaiveDateTime>,
}

impl CacheEnvelope {
    /// Finds the day stored for `date`.
    pub fn find(&self, date: NaiveDate) -> Option<&PrayerDay> {
        self.days.iter().find(|day| day.calendar_date() == Some(date))
    }

    /// First stored day strictly after `date`.
    pub fn next_after(&self, date: NaiveDate) -> Option<&PrayerDay> {
        self.days
            .iter()
            .filter(|day| day.calendar_date().is_some_and(|d| d > date))
            .min_by_key(|day| day.calendar_date())
    }

    /// Replaces every durable day with `days`, keeping pending temporary ones.
    pub fn replace_days(&mut self, days: Vec<PrayerDay>) {
        let pending: Vec<PrayerDay> = self
            .days
            .drain(..)
            .filter(|day| day.is_temporary())
            .filter(|day| !days.iter().any(|fetched| fetched.date == day.date))
            .collect();

        self.days = days;
        self.days.extend(pending);
        self.sort();
    }

    /// Inserts `day`, replacing the record with the same date.
    pub fn merge_by_date(&mut self, day: PrayerDay) {
        self.days.retain(|stored| stored.date != day.date);
        self.days.push(day);
        self.sort();
    }

    /// Inserts `day`, replacing the record with the same id.
    pub fn merge_by_id(&mut self, day: PrayerDay) {
        if let Some(stored) = self
            .days
            .iter_mut()
            .find(|stored| stored.id.is_some() && stored.id == day.id)
        {
            *stored = day;
        } else {
            self.days.push(day);
        }
        self.sort();
    }

    /// Removes the record with `id`, returns whether one existed.
    pub fn remove_id(&mut self, id: &str) -> bool {
        let before = self.days.len();
        self.days.retain(|day| day.id.as_deref() != Some(id));
        before != self.days.len()
    }

    fn sort(&mut self) {
        self.days.sort_by(|a, b| a.date.cmp(&b.date));
    }
}

/// Handles loading and persisting the [`CacheEnvelope`].
///
/// Loading never fails: a missing or corrupted file yields an empty
/// envelope. Writes replace the whole file through a rename, the last writer
/// wins and readers never see a partial file.
///
/// # Examples
///
/// ```no_run
/// let store = MirrorStore::new("data/mirror.json");
/// let mut envelope = store.load().await;
/// envelope.jummah = None;
/// store.persist(&envelope).await;
/// ```
#[derive(Clone)]
pub struct MirrorStore {
    path: PathBuf,
}

impl MirrorStore {
    /// Creates a new `MirrorStore` backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        MirrorStore { path: path.into() }
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }

    /// Reads the envelope as another process left it, `None` when the file
    /// is missing or unreadable.
    pub async fn read(&self) -> Option<CacheEnvelope> {
        let serialized = fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&serialized) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                debug!("ignoring unreadable mirror: {}", e);
                None
            }
        }
    }

    /// Loads the envelope from disk.
    ///
    /// - If the file doesn't exist: logs a warning and returns an empty envelope
    /// - If deserialization fails: logs an error and returns an empty envelope
    pub async fn load(&self) -> CacheEnvelope {
        let Ok(serialized) = fs::read_to_string(&self.path).await else {
            warn!(
                "no mirror found at {}, starting empty",
                self.path.display()
            );
            return CacheEnvelope::default();
        };

        let envelope: CacheEnvelope = match serde_json::from_str(&serialized) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("failed to deserialize mirror, starting empty: {}", e);
                return CacheEnvelope::default();
            }
        };

        info!("loaded {} prayer days from mirror", envelope.days.len());

        envelope
    }

    /// Persists the envelope to disk.
    ///
    /// Errors are logged but not propagated, the in-memory state stays
    /// authoritative until the next successful write.
    pub async fn persist(&self, envelope: &CacheEnvelope) {
        let serialized = match serde_json::to_string(envelope) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!("failed to serialize mirror: {}", e);
                return;
            }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent).await {
                error!("failed to create mirror directory: {}", e);
                return;
            }
        }

        let staging = self.staging_path();
        if let Err(e) = fs::write(&staging, &serialized).await {
            error!("failed to persist mirror: {}", e);
            return;
        }
        if let Err(e) = fs::rename(&staging, &self.path).await {
            error!("failed to replace mirror: {}", e);
            return;
        }

        info!("persisted mirror with {} prayer days", envelope.days.len());
    }

    /// Removes the mirror file, a missing file is not an error.
    pub async fn clear(&self) {
        match fs::remove_file(&self.path).await {
            Ok(()) => info!("removed mirror {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!("failed to remove mirror: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    fn day(id: Option<&str>, date: &str) -> PrayerDay {
        PrayerDay {
            id: id.map(str::to_owned),
            date: date.to_owned(),
            sehri_end: "03:10".to_owned(),
            ..Default::default()
        }
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_load_nonexistent_file_returns_empty() {
        let store = MirrorStore::new("nonexistent_mirror.json");
        assert_eq!(store.load().await, CacheEnvelope::default());
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = MirrorStore::new(temp_file.path());

        let envelope = CacheEnvelope {
            days: vec![day(Some("1"), "2024-06-15")],
            last_refreshed: NaiveDate::from_ymd_opt(2024, 6, 15)
                .unwrap()
                .and_hms_opt(9, 0, 0),
            jummah: Some(JummahSetting {
                first_jamat: "13:30".to_owned(),
                second_jamat: Some("14:15".to_owned()),
            }),
            jummah_refreshed: None,
            touched: None,
        };
        store.persist(&envelope).await;

        assert_eq!(store.load().await, envelope);
    }

    #[tokio::test]
    async fn test_persist_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = MirrorStore::new(dir.path().join("data").join("mirror.json"));

        store.persist(&CacheEnvelope::default()).await;
        store.clear().await;
        store.clear().await;
    }

    #[tokio::test]
    async fn test_read_sees_other_writers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mirror.json");
        let reader = MirrorStore::new(&path);
        assert_eq!(reader.read().await, None);

        let envelope = CacheEnvelope {
            days: vec![day(Some("1"), "2024-06-15")],
            ..Default::default()
        };
        MirrorStore::new(&path).persist(&envelope).await;

        assert_eq!(reader.read().await, Some(envelope));
        assert!(!dir.path().join("mirror.json.tmp").exists());

        fs::write(&path, "{ half written").await.unwrap();
        assert_eq!(reader.read().await, None);
    }

    #[tokio::test]
    async fn test_load_corrupted_json_returns_empty() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "{ this is not valid json ")
            .await
            .unwrap();

        let store = MirrorStore::new(temp_file.path());
        assert!(store.load().await.days.is_empty());
    }

    #[test]
    fn test_replace_days_keeps_pending_temporary() {
        let mut envelope = CacheEnvelope {
            days: vec![
                day(Some("1"), "2024-06-14"),
                day(Some("local-a"), "2024-06-20"),
                day(Some("local-b"), "2024-06-15"),
            ],
            ..Default::default()
        };

        envelope.replace_days(vec![day(Some("2"), "2024-06-15"), day(Some("3"), "2024-06-16")]);

        let ids: Vec<_> = envelope.days.iter().filter_map(|d| d.id.as_deref()).collect();
        assert_eq!(ids, vec!["2", "3", "local-a"]);
    }

    #[test]
    fn test_merge_and_lookup() {
        let mut envelope = CacheEnvelope::default();
        envelope.merge_by_date(day(Some("2"), "2024-06-16"));
        envelope.merge_by_date(day(Some("1"), "2024-06-15"));
        envelope.merge_by_date(day(Some("3"), "2024-06-15"));

        assert_eq!(envelope.days.len(), 2);
        assert_eq!(envelope.find(date("2024-06-15")).unwrap().id.as_deref(), Some("3"));
        assert_eq!(
            envelope.next_after(date("2024-06-15")).unwrap().date,
            "2024-06-16"
        );
        assert!(envelope.next_after(date("2024-06-16")).is_none());

        let mut updated = day(Some("2"), "2024-06-17");
        updated.sunrise = "04:40".to_owned();
        envelope.merge_by_id(updated);
        assert_eq!(envelope.days[1].date, "2024-06-17");

        assert!(envelope.remove_id("2"));
        assert!(!envelope.remove_id("2"));
    }
}
