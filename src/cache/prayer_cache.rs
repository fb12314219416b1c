//! Stale-while-offline cache in front of the [`Gateway`].
//!
//! Reads resolve through three tiers: the backend when the mirror is stale,
//! the local mirror, then built-in defaults. They never fail. Writes go to
//! the backend first and only touch the mirror once it accepted them, except
//! for creations which degrade into temporary local records.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use log::{debug, info, warn};
use tokio::time;
use uuid::Uuid;

use crate::{
    cache::{
        clock::Clock,
        mirror::{CacheEnvelope, MirrorStore},
        notify::{ChangeBus, DataSet},
    },
    error::{BoardError, GatewayError},
    gateway::{DayFilter, Gateway},
    prayers::{
        DailyHadith, HadithItem, HadithText, JummahSetting, PrayerDay, TEMPORARY_ID_PREFIX,
        default_day, select_daily,
    },
};

/// Tuning of a [`PrayerCache`].
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    /// How long a refresh keeps the mirror authoritative
    pub ttl: Duration,
    /// Bound on every backend call
    pub request_timeout: Duration,
}

/// Where a written prayer day ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Stored by the backend, carries the durable row.
    Synced(PrayerDay),
    /// Backend unreachable, kept in the mirror under a temporary id.
    LocalOnly(PrayerDay),
}

impl WriteOutcome {
    pub fn day(&self) -> &PrayerDay {
        match self {
            WriteOutcome::Synced(day) | WriteOutcome::LocalOnly(day) => day,
        }
    }
}

/// Runs a backend call under `bound`, a timeout counts as a failure.
async fn bounded<T>(
    bound: Duration,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    match time::timeout(bound, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout),
    }
}

/// Cache of prayer days, the Jummah setting and hadiths.
///
/// The cache owns the gateway and the mirror; every component that needs
/// data goes through it so that freshness is tracked in one place.
pub struct PrayerCache<G: Gateway> {
    gateway: G,
    store: MirrorStore,
    envelope: CacheEnvelope,
    bus: ChangeBus,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    request_timeout: Duration,
    /// Last good calendar hadiths, by month
    calendar: HashMap<u32, Vec<DailyHadith>>,
    /// Last good hadith collection
    collection: Vec<HadithItem>,
}

impl<G: Gateway> PrayerCache<G> {
    /// Create a new [PrayerCache], loading the mirror from `store`.
    ///
    /// # Arguments
    ///
    /// * `gateway` - Backend repository.
    /// * `store` - Mirror file.
    /// * `bus` - Where write notices are published.
    /// * `clock` - Wall clock used for freshness and "today".
    /// * `settings` - Freshness window and request bound.
    pub async fn new(
        gateway: G,
        store: MirrorStore,
        bus: ChangeBus,
        clock: Arc<dyn Clock>,
        settings: CacheSettings,
    ) -> Self {
        let envelope = store.load().await;

        PrayerCache {
            gateway,
            store,
            envelope,
            bus,
            clock,
            ttl: TimeDelta::from_std(settings.ttl).unwrap_or(TimeDelta::zero()),
            request_timeout: settings.request_timeout,
            calendar: HashMap::new(),
            collection: Vec::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    fn is_fresh(&self, refreshed: Option<NaiveDateTime>) -> bool {
        refreshed.is_some_and(|at| self.clock.now() - at < self.ttl)
    }

    async fn commit(&self, dataset: DataSet) {
        self.store.persist(&self.envelope).await;
        self.bus.publish(dataset);
    }

    /// Every prayer day, ordered by date.
    ///
    /// Falls back to the mirror when the backend fails, then to the default
    /// day for today.
    pub async fn all_days(&mut self, force: bool) -> Vec<PrayerDay> {
        if !force && self.is_fresh(self.envelope.last_refreshed) && !self.envelope.days.is_empty()
        {
            debug!("serving {} prayer days from mirror", self.envelope.days.len());
            return self.envelope.days.clone();
        }

        match bounded(self.request_timeout, self.gateway.list_days(DayFilter::All)).await {
            Ok(days) => {
                info!("refreshed {} prayer days", days.len());
                self.envelope.replace_days(days);
                self.envelope.last_refreshed = Some(self.clock.now());
                self.store.persist(&self.envelope).await;
            }
            Err(e) => warn!("failed to refresh prayer days, serving mirror: {}", e),
        }

        if self.envelope.days.is_empty() {
            return vec![default_day(self.clock.now().date())];
        }
        self.envelope.days.clone()
    }

    /// The prayer day to show for `date`.
    ///
    /// Resolution order: fresh mirror hit, backend day, nearest following
    /// day, built-in defaults stamped with `date`. A fresh mirror holds the
    /// full list, so it answers alone.
    pub async fn day_for(&mut self, date: NaiveDate, force: bool) -> PrayerDay {
        if !force && self.is_fresh(self.envelope.last_refreshed) {
            if let Some(day) = self.envelope.find(date) {
                return day.clone();
            }
            if let Some(next) = self.envelope.next_after(date) {
                debug!("no prayer day for {}, showing mirrored {}", date, next.date);
                return next.clone();
            }
            debug!("no prayer day for {} in fresh mirror, using defaults", date);
            return default_day(date);
        }

        // A single date fetch never makes the whole mirror fresh
        let reachable =
            match bounded(self.request_timeout, self.gateway.list_days(DayFilter::On(date))).await {
                Ok(days) => {
                    for day in days {
                        self.envelope.merge_by_date(day);
                    }
                    self.store.persist(&self.envelope).await;
                    true
                }
                Err(e) => {
                    warn!("failed to fetch prayer day {}: {}", date, e);
                    false
                }
            };

        if let Some(day) = self.envelope.find(date) {
            return day.clone();
        }

        if reachable {
            match bounded(
                self.request_timeout,
                self.gateway.list_days(DayFilter::From(date)),
            )
            .await
            {
                Ok(days) => {
                    if let Some(next) = days.into_iter().next() {
                        info!("no prayer day for {}, showing {}", date, next.date);
                        self.envelope.merge_by_date(next.clone());
                        self.store.persist(&self.envelope).await;
                        return next;
                    }
                }
                Err(e) => warn!("failed to fetch days after {}: {}", date, e),
            }
        }

        if let Some(next) = self.envelope.next_after(date) {
            info!("no prayer day for {}, showing mirrored {}", date, next.date);
            return next.clone();
        }

        info!("no prayer day for {}, using defaults", date);
        default_day(date)
    }

    /// Prayer days from `from` to `to`, inclusive.
    ///
    /// Served from the backend when reachable, from the mirror otherwise.
    pub async fn days_between(&mut self, from: NaiveDate, to: NaiveDate) -> Vec<PrayerDay> {
        match bounded(
            self.request_timeout,
            self.gateway.list_days(DayFilter::Between(from, to)),
        )
        .await
        {
            Ok(days) => {
                for day in &days {
                    self.envelope.merge_by_date(day.clone());
                }
                self.store.persist(&self.envelope).await;
                days
            }
            Err(e) => {
                warn!("failed to fetch days {} to {}, serving mirror: {}", from, to, e);
                self.envelope
                    .days
                    .iter()
                    .filter(|day| {
                        day.calendar_date()
                            .is_some_and(|date| from <= date && date <= to)
                    })
                    .cloned()
                    .collect()
            }
        }
    }

    /// The prayer day for the local date.
    pub async fn today(&mut self) -> PrayerDay {
        let date = self.clock.now().date();
        self.day_for(date, false).await
    }

    /// Creates a prayer day.
    ///
    /// When the backend refuses or cannot be reached the day is kept in the
    /// mirror under a `local-` id and synced by the next [`Self::update_day`].
    pub async fn add_day(&mut self, day: PrayerDay) -> WriteOutcome {
        match bounded(self.request_timeout, self.gateway.insert_day(&day)).await {
            Ok(stored) => {
                self.envelope.merge_by_date(stored.clone());
                self.commit(DataSet::PrayerDays).await;
                WriteOutcome::Synced(stored)
            }
            Err(e) => {
                warn!(
                    "failed to store prayer day {} remotely, keeping it locally: {}",
                    day.date, e
                );
                let local = PrayerDay {
                    id: Some(format!("{}{}", TEMPORARY_ID_PREFIX, Uuid::new_v4())),
                    ..day
                };
                self.envelope.merge_by_date(local.clone());
                self.commit(DataSet::PrayerDays).await;
                WriteOutcome::LocalOnly(local)
            }
        }
    }

    /// Updates the prayer day `id`.
    ///
    /// A temporary record is inserted remotely instead and migrates to its
    /// durable id on success.
    pub async fn update_day(
        &mut self,
        id: &str,
        day: PrayerDay,
    ) -> Result<WriteOutcome, BoardError> {
        if !id.starts_with(TEMPORARY_ID_PREFIX) {
            let stored =
                bounded(self.request_timeout, self.gateway.update_day(id, &day)).await?;
            self.envelope.merge_by_id(stored.clone());
            self.commit(DataSet::PrayerDays).await;
            return Ok(WriteOutcome::Synced(stored));
        }

        self.envelope.remove_id(id);
        let outcome = match bounded(self.request_timeout, self.gateway.insert_day(&day)).await {
            Ok(stored) => {
                info!("synced temporary prayer day {} as {:?}", id, stored.id);
                WriteOutcome::Synced(stored)
            }
            Err(e) => {
                warn!("temporary prayer day {} still not synced: {}", id, e);
                WriteOutcome::LocalOnly(PrayerDay {
                    id: Some(id.to_owned()),
                    ..day
                })
            }
        };
        self.envelope.merge_by_date(outcome.day().clone());
        self.commit(DataSet::PrayerDays).await;

        Ok(outcome)
    }

    /// Deletes the prayer day `id`, temporary records only locally.
    pub async fn delete_day(&mut self, id: &str) -> Result<(), BoardError> {
        if !id.starts_with(TEMPORARY_ID_PREFIX) {
            bounded(self.request_timeout, self.gateway.delete_day(id)).await?;
        }
        self.envelope.remove_id(id);
        self.commit(DataSet::PrayerDays).await;
        Ok(())
    }

    pub async fn delete_all_days(&mut self) -> Result<(), BoardError> {
        bounded(self.request_timeout, self.gateway.delete_all_days()).await?;
        self.envelope.days.clear();
        self.commit(DataSet::PrayerDays).await;
        Ok(())
    }

    /// Inserts many prayer days at once, nothing is kept locally on failure.
    pub async fn insert_days(&mut self, days: &[PrayerDay]) -> Result<Vec<PrayerDay>, BoardError> {
        let stored = bounded(self.request_timeout, self.gateway.insert_days(days)).await?;
        for day in &stored {
            self.envelope.merge_by_date(day.clone());
        }
        self.commit(DataSet::PrayerDays).await;
        Ok(stored)
    }

    /// The Jummah setting, `None` when none was ever set.
    pub async fn jummah(&mut self, force: bool) -> Option<JummahSetting> {
        if !force && self.is_fresh(self.envelope.jummah_refreshed) {
            return self.envelope.jummah.clone();
        }

        match bounded(self.request_timeout, self.gateway.get_jummah()).await {
            Ok(setting) => {
                self.envelope.jummah = setting;
                self.envelope.jummah_refreshed = Some(self.clock.now());
                self.store.persist(&self.envelope).await;
            }
            Err(e) => warn!("failed to fetch jummah setting, serving mirror: {}", e),
        }

        self.envelope.jummah.clone()
    }

    pub async fn set_jummah(&mut self, setting: &JummahSetting) -> Result<JummahSetting, BoardError> {
        let stored = bounded(self.request_timeout, self.gateway.upsert_jummah(setting)).await?;
        self.envelope.jummah = Some(stored.clone());
        self.envelope.jummah_refreshed = Some(self.clock.now());
        self.commit(DataSet::Jummah).await;
        Ok(stored)
    }

    /// The hadith to show on `date`.
    ///
    /// Lists that cannot be fetched are replaced by the last good ones.
    pub async fn daily_hadith(&mut self, date: NaiveDate) -> HadithText {
        let month = date.month();

        match bounded(self.request_timeout, self.gateway.list_daily_hadiths(month)).await {
            Ok(calendar) => {
                self.calendar.insert(month, calendar);
            }
            Err(e) => warn!("failed to fetch daily hadiths, using last known: {}", e),
        }

        match bounded(self.request_timeout, self.gateway.list_hadiths()).await {
            Ok(collection) => self.collection = collection,
            Err(e) => warn!("failed to fetch hadith collection, using last known: {}", e),
        }

        let calendar = self.calendar.get(&month).map(Vec::as_slice).unwrap_or(&[]);
        select_daily(calendar, &self.collection, date)
    }

    /// Records a write the mirror does not hold, such as a hadith change.
    ///
    /// The stamp changes the mirror file, so boards sharing it reload.
    pub async fn touch(&mut self, dataset: DataSet) {
        self.envelope.touched = Some(self.clock.now());
        self.commit(dataset).await;
    }

    /// Marks every mirrored dataset stale and tells other views to reload.
    pub async fn invalidate(&mut self) {
        self.envelope.last_refreshed = None;
        self.envelope.jummah_refreshed = None;
        self.touch(DataSet::All).await;
    }

    /// Adopts the mirror file when another process changed it.
    ///
    /// Returns whether the on-disk envelope differed from the one in memory;
    /// the caller is expected to force a refresh then.
    pub async fn reload_mirror(&mut self) -> bool {
        let Some(on_disk) = self.store.read().await else {
            return false;
        };
        if on_disk == self.envelope {
            return false;
        }

        info!("mirror changed by another process, adopting it");
        self.envelope = on_disk;
        true
    }

    /// Forgets everything mirrored, on disk too.
    pub async fn clear(&mut self) {
        self.envelope = CacheEnvelope::default();
        self.calendar.clear();
        self.collection.clear();
        self.store.clear().await;
        self.bus.publish(DataSet::All);
    }
}
