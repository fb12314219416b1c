//! Authenticated write access to the board data.
//!
//! Every write made by an operator goes through an [`AdminSession`], which
//! can only be opened for a user whose profile carries the `admin` role.
//! Inputs are validated before anything reaches the backend.

use std::path::Path;

use chrono::NaiveDate;
use log::{info, warn};

use crate::{
    cache::{DataSet, PrayerCache, WriteOutcome},
    error::BoardError,
    gateway::{Gateway, Profile},
    import::{ImportOptions, ParsedTimetable, parse_file},
    prayers::{DATE_FORMAT, DailyHadith, HadithItem, JummahSetting, PrayerDay},
    time_format::parse_time,
};

/// Result of [`AdminSession::import_days`].
#[derive(Debug)]
pub struct ImportReport {
    pub parsed: ParsedTimetable,
    /// Days stored by the backend, zero on a dry run
    pub inserted: usize,
}

/// Write session of an admin user.
pub struct AdminSession<'a, G: Gateway> {
    cache: &'a mut PrayerCache<G>,
    profile: Profile,
}

impl<'a, G: Gateway> AdminSession<'a, G> {
    /// Opens a session for `user_id`.
    ///
    /// Fails with [`BoardError::AccessDenied`] when no user is given, when
    /// the profile is missing or not an admin, and when the lookup fails.
    pub async fn login(
        cache: &'a mut PrayerCache<G>,
        user_id: Option<&str>,
    ) -> Result<Self, BoardError> {
        let Some(user_id) = user_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Err(BoardError::AccessDenied("no user configured".to_owned()));
        };

        let profile = match cache.gateway().get_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                return Err(BoardError::AccessDenied(format!(
                    "no profile for user {}",
                    user_id
                )));
            }
            Err(e) => {
                warn!("failed to check profile of {}: {}", user_id, e);
                return Err(BoardError::AccessDenied(format!(
                    "could not verify user {}",
                    user_id
                )));
            }
        };

        if !profile.is_admin() {
            return Err(BoardError::AccessDenied(format!(
                "user {} is not an admin",
                user_id
            )));
        }

        info!("admin session opened for {}", user_id);
        Ok(AdminSession { cache, profile })
    }

    pub fn user_id(&self) -> &str {
        &self.profile.id
    }

    pub async fn add_day(&mut self, day: PrayerDay) -> Result<WriteOutcome, BoardError> {
        validate_day(&day)?;
        Ok(self.cache.add_day(day).await)
    }

    pub async fn update_day(
        &mut self,
        id: &str,
        day: PrayerDay,
    ) -> Result<WriteOutcome, BoardError> {
        validate_day(&day)?;
        self.cache.update_day(id, day).await
    }

    pub async fn delete_day(&mut self, id: &str) -> Result<(), BoardError> {
        self.cache.delete_day(id).await
    }

    pub async fn delete_all_days(&mut self) -> Result<(), BoardError> {
        info!("{} deletes every prayer day", self.user_id());
        self.cache.delete_all_days().await
    }

    /// Imports the timetable at `path`.
    ///
    /// Rows are stored as parsed, values that could not be normalised are
    /// only reported. With `replace` every stored day is deleted first.
    pub async fn import_days(
        &mut self,
        path: &Path,
        options: ImportOptions,
    ) -> Result<ImportReport, BoardError> {
        let parsed = parse_file(path, options.header).await?;
        info!(
            "parsed {} prayer days from {} ({} skipped)",
            parsed.days.len(),
            path.display(),
            parsed.skipped
        );

        if options.dry_run {
            return Ok(ImportReport {
                parsed,
                inserted: 0,
            });
        }

        if options.replace {
            self.cache.delete_all_days().await?;
        }

        let inserted = if parsed.days.is_empty() {
            0
        } else {
            self.cache.insert_days(&parsed.days).await?.len()
        };

        Ok(ImportReport { parsed, inserted })
    }

    /// Stores the Jummah setting and asks every board to reload.
    pub async fn set_jummah(&mut self, setting: JummahSetting) -> Result<JummahSetting, BoardError> {
        require_time("first jamat", &setting.first_jamat)?;
        if let Some(second) = &setting.second_jamat {
            optional_time("second jamat", second)?;
        }

        let stored = self.cache.set_jummah(&setting).await?;

        if let Err(e) = self.cache.gateway().broadcast_reload().await {
            warn!("jummah saved but reload broadcast failed: {}", e);
        }

        Ok(stored)
    }

    /// Asks every board to reload all its data.
    ///
    /// Remote boards get the realtime broadcast, boards sharing this data
    /// directory see the invalidated mirror.
    pub async fn broadcast_reload(&mut self) -> Result<(), BoardError> {
        self.cache.gateway().broadcast_reload().await?;
        self.cache.invalidate().await;
        info!("{} asked every board to reload", self.profile.id);
        Ok(())
    }

    pub async fn add_hadith(&mut self, hadith: HadithItem) -> Result<HadithItem, BoardError> {
        require_text(&hadith.text)?;
        let stored = self.cache.gateway().insert_hadith(&hadith).await?;
        self.cache.touch(DataSet::Hadith).await;
        Ok(stored)
    }

    pub async fn update_hadith(
        &mut self,
        id: &str,
        hadith: HadithItem,
    ) -> Result<HadithItem, BoardError> {
        require_text(&hadith.text)?;
        let stored = self.cache.gateway().update_hadith(id, &hadith).await?;
        self.cache.touch(DataSet::Hadith).await;
        Ok(stored)
    }

    pub async fn delete_hadith(&mut self, id: &str) -> Result<(), BoardError> {
        self.cache.gateway().delete_hadith(id).await?;
        self.cache.touch(DataSet::Hadith).await;
        Ok(())
    }

    pub async fn add_daily_hadith(
        &mut self,
        hadith: DailyHadith,
    ) -> Result<DailyHadith, BoardError> {
        validate_daily_hadith(&hadith)?;
        let stored = self.cache.gateway().insert_daily_hadith(&hadith).await?;
        self.cache.touch(DataSet::Hadith).await;
        Ok(stored)
    }

    pub async fn update_daily_hadith(
        &mut self,
        id: &str,
        hadith: DailyHadith,
    ) -> Result<DailyHadith, BoardError> {
        validate_daily_hadith(&hadith)?;
        let stored = self
            .cache
            .gateway()
            .update_daily_hadith(id, &hadith)
            .await?;
        self.cache.touch(DataSet::Hadith).await;
        Ok(stored)
    }

    pub async fn delete_daily_hadith(&mut self, id: &str) -> Result<(), BoardError> {
        self.cache.gateway().delete_daily_hadith(id).await?;
        self.cache.touch(DataSet::Hadith).await;
        Ok(())
    }
}

/// Checks a prayer day before it is written.
///
/// The date must be ISO and the Fajr start present; every other non-blank
/// time must parse.
pub fn validate_day(day: &PrayerDay) -> Result<(), BoardError> {
    if NaiveDate::parse_from_str(day.date.trim(), DATE_FORMAT).is_err() {
        return Err(BoardError::Validation(format!(
            "date {:?} is not YYYY-MM-DD",
            day.date
        )));
    }

    require_time("sehri end", &day.sehri_end)?;

    let optional = [
        ("fajr jamat", &day.fajr_jamat),
        ("sunrise", &day.sunrise),
        ("zuhr start", &day.zuhr_start),
        ("zuhr jamat", &day.zuhr_jamat),
        ("asr start", &day.asr_start),
        ("asr jamat", &day.asr_jamat),
        ("maghrib", &day.maghrib_iftar),
        ("isha start", &day.isha_start),
        ("isha first jamat", &day.isha_first_jamat),
    ];
    for (name, value) in optional {
        optional_time(name, value)?;
    }
    if let Some(second) = &day.isha_second_jamat {
        optional_time("isha second jamat", second)?;
    }

    Ok(())
}

fn require_time(name: &str, value: &str) -> Result<(), BoardError> {
    if value.trim().is_empty() {
        return Err(BoardError::Validation(format!("{} is required", name)));
    }
    optional_time(name, value)
}

fn optional_time(name: &str, value: &str) -> Result<(), BoardError> {
    if value.trim().is_empty() || parse_time(value).is_some() {
        Ok(())
    } else {
        Err(BoardError::Validation(format!(
            "{} {:?} is not a time",
            name, value
        )))
    }
}

fn require_text(text: &str) -> Result<(), BoardError> {
    if text.trim().is_empty() {
        return Err(BoardError::Validation("hadith text is required".to_owned()));
    }
    Ok(())
}

fn validate_daily_hadith(hadith: &DailyHadith) -> Result<(), BoardError> {
    require_text(&hadith.text)?;
    if !(1..=31).contains(&hadith.day_of_month) {
        return Err(BoardError::Validation(format!(
            "day of month {} is out of range",
            hadith.day_of_month
        )));
    }
    if hadith.month.is_some_and(|month| !(1..=12).contains(&month)) {
        return Err(BoardError::Validation("month is out of range".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{CacheSettings, ChangeBus, ManualClock, MirrorStore},
        error::GatewayError,
        gateway::MockGateway,
    };
    use std::{io::Write, sync::Arc, time::Duration};
    use tempfile::{NamedTempFile, TempDir};

    async fn cache(gateway: MockGateway, dir: &TempDir) -> PrayerCache<MockGateway> {
        PrayerCache::new(
            gateway,
            MirrorStore::new(dir.path().join("mirror.json")),
            ChangeBus::new(16),
            Arc::new(ManualClock::at("2024-06-15 09:00")),
            CacheSettings {
                ttl: Duration::from_secs(300),
                request_timeout: Duration::from_secs(5),
            },
        )
        .await
    }

    fn admin_gateway() -> MockGateway {
        let mut gateway = MockGateway::new();
        gateway.expect_get_profile().returning(|id| {
            Ok(Some(Profile {
                id: id.to_owned(),
                role: Some("admin".to_owned()),
            }))
        });
        gateway
    }

    fn day(date: &str) -> PrayerDay {
        PrayerDay {
            date: date.to_owned(),
            sehri_end: "03:10".to_owned(),
            fajr_jamat: "4:00 AM".to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_login_denied_for_viewer() {
        let dir = TempDir::new().unwrap();
        let mut gateway = MockGateway::new();
        gateway.expect_get_profile().returning(|id| {
            Ok(Some(Profile {
                id: id.to_owned(),
                role: None,
            }))
        });
        let mut cache = cache(gateway, &dir).await;

        let result = AdminSession::login(&mut cache, Some("u1")).await;
        assert!(matches!(result, Err(BoardError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_login_fails_closed() {
        let dir = TempDir::new().unwrap();
        let mut gateway = MockGateway::new();
        gateway
            .expect_get_profile()
            .returning(|_| Err(GatewayError::Timeout));
        let mut cache = cache(gateway, &dir).await;

        let result = AdminSession::login(&mut cache, Some("u1")).await;
        assert!(matches!(result, Err(BoardError::AccessDenied(_))));

        let result = AdminSession::login(&mut cache, None).await;
        assert!(matches!(result, Err(BoardError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_invalid_day_never_reaches_backend() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache(admin_gateway(), &dir).await;
        let mut session = AdminSession::login(&mut cache, Some("u1")).await.unwrap();
        assert_eq!(session.user_id(), "u1");

        let result = session.add_day(day("15/06/2024")).await;
        assert!(matches!(result, Err(BoardError::Validation(_))));

        let mut bad_time = day("2024-06-15");
        bad_time.asr_jamat = "after zuhr".to_owned();
        let result = session.update_day("1", bad_time).await;
        assert!(matches!(result, Err(BoardError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_day() {
        let dir = TempDir::new().unwrap();
        let mut gateway = admin_gateway();
        gateway.expect_insert_day().times(1).returning(|day| {
            Ok(PrayerDay {
                id: Some("5".to_owned()),
                ..day.clone()
            })
        });
        let mut cache = cache(gateway, &dir).await;
        let mut session = AdminSession::login(&mut cache, Some("u1")).await.unwrap();

        let outcome = session.add_day(day("2024-06-15")).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Synced(PrayerDay {
            id: Some("5".to_owned()),
            ..day("2024-06-15")
        }));
    }

    #[tokio::test]
    async fn test_set_jummah_broadcasts_reload() {
        let dir = TempDir::new().unwrap();
        let mut gateway = admin_gateway();
        gateway
            .expect_upsert_jummah()
            .times(1)
            .returning(|setting| Ok(setting.clone()));
        gateway.expect_broadcast_reload().times(1).returning(|| Ok(()));
        let mut cache = cache(gateway, &dir).await;
        let mut session = AdminSession::login(&mut cache, Some("u1")).await.unwrap();

        let setting = JummahSetting {
            first_jamat: "13:30".to_owned(),
            second_jamat: Some("".to_owned()),
        };
        assert_eq!(session.set_jummah(setting.clone()).await.unwrap(), setting);

        let invalid = JummahSetting {
            first_jamat: "".to_owned(),
            second_jamat: None,
        };
        assert!(matches!(
            session.set_jummah(invalid).await,
            Err(BoardError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_reload_invalidates_shared_mirror() {
        let dir = TempDir::new().unwrap();
        let mut gateway = admin_gateway();
        gateway.expect_broadcast_reload().times(1).returning(|| Ok(()));
        let mut cache = cache(gateway, &dir).await;
        let mut notices = cache.bus().subscribe();
        let mut session = AdminSession::login(&mut cache, Some("u1")).await.unwrap();

        session.broadcast_reload().await.unwrap();
        assert_eq!(notices.recv().await.unwrap().dataset, DataSet::All);

        let persisted = MirrorStore::new(dir.path().join("mirror.json")).read().await;
        let persisted = persisted.unwrap();
        assert!(persisted.touched.is_some());
        assert_eq!(persisted.last_refreshed, None);
    }

    #[tokio::test]
    async fn test_broadcast_reload_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut gateway = admin_gateway();
        gateway
            .expect_broadcast_reload()
            .times(1)
            .returning(|| Err(GatewayError::Status(401)));
        let mut cache = cache(gateway, &dir).await;
        let mut session = AdminSession::login(&mut cache, Some("u1")).await.unwrap();

        assert!(matches!(
            session.broadcast_reload().await,
            Err(BoardError::RemoteUnavailable(GatewayError::Status(401)))
        ));
    }

    #[tokio::test]
    async fn test_hadith_write_publishes_notice() {
        let dir = TempDir::new().unwrap();
        let mut gateway = admin_gateway();
        gateway
            .expect_insert_daily_hadith()
            .times(1)
            .returning(|hadith| Ok(hadith.clone()));
        let mut cache = cache(gateway, &dir).await;
        let mut notices = cache.bus().subscribe();
        let mut session = AdminSession::login(&mut cache, Some("u1")).await.unwrap();

        let hadith = DailyHadith {
            id: None,
            day_of_month: 1,
            month: None,
            text: "Text".to_owned(),
            source: "Source".to_owned(),
        };
        session.add_daily_hadith(hadith.clone()).await.unwrap();
        assert_eq!(notices.recv().await.unwrap().dataset, DataSet::Hadith);

        let out_of_range = DailyHadith {
            day_of_month: 32,
            ..hadith
        };
        assert!(matches!(
            session.add_daily_hadith(out_of_range).await,
            Err(BoardError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_import_replace_and_dry_run() {
        let dir = TempDir::new().unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"2024-06-15,,03:10,04:00,04:45\n2024-06-16,,03:10,04:00,04:45\n")
            .unwrap();

        let mut gateway = admin_gateway();
        gateway.expect_delete_all_days().times(1).returning(|| Ok(()));
        gateway
            .expect_insert_days()
            .times(1)
            .returning(|days| Ok(days.to_vec()));
        let mut cache = cache(gateway, &dir).await;
        let mut session = AdminSession::login(&mut cache, Some("u1")).await.unwrap();

        let dry = ImportOptions {
            dry_run: true,
            replace: true,
            ..Default::default()
        };
        let report = session.import_days(file.path(), dry).await.unwrap();
        assert_eq!(report.parsed.days.len(), 2);
        assert_eq!(report.inserted, 0);

        let replace = ImportOptions {
            replace: true,
            ..Default::default()
        };
        let report = session.import_days(file.path(), replace).await.unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.parsed.days[1].day, "Sunday");
    }
}
