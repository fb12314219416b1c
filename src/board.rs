//! Board module running the prayer times display.
//!
//! This module provides the [`Board`] which wires the cache, the alert
//! scheduler and the text display together and keeps them running.
//!
//! # Architecture
//!
//! The board operates with three concurrent tasks:
//!
//! 1. **Sync Task**: Refreshes the cache every `polling_interval` seconds, at
//!    local midnight, whenever a change notice or a reload signal arrives and
//!    when an admin command run from another process rewrites the mirror,
//!    then publishes the day to show.
//!
//! 2. **Display Task**: Evaluates the active and next prayers once per minute
//!    and prints the board.
//!
//! 3. **Alert Scheduler**: Fires jamat alerts for the published day, see
//!    [`crate::alerts`].
//!
//! ```text
//! Timer / ChangeNotice / mirror file → Cache refresh → watch(Schedule) → Alerts
//!                                      → watch(BoardView) → Display
//! ```

use std::{path::Path, sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::{
    fs,
    sync::{Mutex, broadcast::error::RecvError, watch},
    task::JoinHandle,
    time,
};

use crate::{
    alerts::{AlertPlayer, AlertScheduler, Schedule},
    cache::{
        CacheSettings, ChangeBus, Clock, MirrorStore, MirrorWatcher, PrayerCache, SystemClock,
        until_midnight, until_next_minute,
    },
    config::Config,
    gateway::{Gateway, RestGateway, RowChange},
    prayers::{HadithText, evaluate},
    render::format_board,
    utils::mirror_path,
};

/// Capacity of the in-process change bus.
const BUS_CAPACITY: usize = 32;

/// Keeps the display device awake while the board runs.
///
/// Platforms without such a capability use [`NoopKeepAwake`].
pub trait KeepAwake: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// [`KeepAwake`] doing nothing.
pub struct NoopKeepAwake;

impl KeepAwake for NoopKeepAwake {
    fn acquire(&self) {
        debug!("keep awake not supported, display may sleep");
    }

    fn release(&self) {}
}

/// Everything the display task needs for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardView {
    pub schedule: Schedule,
    pub hadith: HadithText,
}

/// Opens the cache over the configured backend and the mirror in `data_dir`.
pub async fn open_cache(
    config: &Config,
    data_dir: &Path,
    bus: ChangeBus,
    clock: Arc<dyn Clock>,
) -> Result<PrayerCache<RestGateway>, anyhow::Error> {
    let gateway = RestGateway::new(
        &config.backend.url,
        &config.backend.api_key,
        config.backend.access_token.clone(),
        config.backend.request_timeout(),
    )?;

    Ok(PrayerCache::new(
        gateway,
        MirrorStore::new(mirror_path(data_dir)),
        bus,
        clock,
        CacheSettings {
            ttl: Duration::from_secs(config.cache.ttl_secs),
            request_timeout: config.backend.request_timeout(),
        },
    )
    .await)
}

/// Refreshes the cache and builds the view of the current day.
///
/// `force` bypasses the freshness window, used after change notices.
pub async fn refresh<G: Gateway>(cache: &mut PrayerCache<G>, force: bool) -> BoardView {
    let today = cache.now().date();

    cache.all_days(force).await;
    let day = cache.today().await;
    let jummah = cache.jummah(force).await;
    let hadith = cache.daily_hadith(today).await;

    BoardView {
        schedule: Schedule { day, jummah },
        hadith,
    }
}

/// Waits for the next mirror change, forever without a watcher.
async fn mirror_changed(watcher: &mut Option<MirrorWatcher>) -> Option<()> {
    match watcher {
        Some(watcher) => watcher.changed().await,
        None => std::future::pending().await,
    }
}

pub struct Board {
    cache: Arc<Mutex<PrayerCache<RestGateway>>>,
    mirror_watcher: Option<MirrorWatcher>,
    clock: Arc<dyn Clock>,
    polling_interval: Duration,
    scheduler: Option<AlertScheduler>,
    player: AlertPlayer,
    render: bool,
    keep_awake: Box<dyn KeepAwake>,
}

impl Board {
    /// Create a new [Board] from the configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration.
    /// * `data_dir` - Directory holding the local mirror.
    pub async fn new(config: &Config, data_dir: &Path) -> Result<Self, anyhow::Error> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        fs::create_dir_all(data_dir).await?;
        let cache = open_cache(
            config,
            data_dir,
            ChangeBus::new(BUS_CAPACITY),
            Arc::clone(&clock),
        )
        .await?;

        let mirror_watcher = match MirrorWatcher::new(&mirror_path(data_dir)) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("cannot watch the mirror, relying on polling only: {}", e);
                None
            }
        };

        let scheduler = config.alerts.enabled.then(|| {
            AlertScheduler::new(
                Arc::clone(&clock),
                Duration::from_secs(config.alerts.poll_interval_secs.max(1)),
            )
        });
        let player = AlertPlayer::new(
            config.alerts.command.clone(),
            config.alerts.max_attempts,
            Duration::from_secs(config.alerts.retry_delay_secs),
        );

        Ok(Board {
            cache: Arc::new(Mutex::new(cache)),
            mirror_watcher,
            clock,
            polling_interval: config.backend.polling_interval(),
            scheduler,
            player,
            render: config.display.render,
            keep_awake: Box::new(NoopKeepAwake),
        })
    }

    /// Runs the board until ctrl-c.
    pub async fn start(mut self) {
        self.keep_awake.acquire();

        let (schedule_tx, schedule_rx) = watch::channel(None);
        let (view_tx, view_rx) = watch::channel(None);

        let mut handles = vec![self.start_sync_task(schedule_tx, view_tx).await];
        if self.render {
            handles.push(self.start_display_task(view_rx));
        }

        if let Some(scheduler) = self.scheduler.as_mut() {
            let player = self.player.clone();
            scheduler.start(schedule_rx, move |alert| {
                let player = player.clone();
                tokio::spawn(async move {
                    player.play(&alert).await;
                });
            });
        } else {
            info!("jamat alerts disabled");
        }

        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutting down"),
            Err(e) => warn!("failed to listen for ctrl-c, shutting down: {}", e),
        }

        for handle in handles {
            handle.abort();
        }
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.stop();
        }
        self.keep_awake.release();
    }

    async fn start_sync_task(
        &mut self,
        schedule_tx: watch::Sender<Option<Schedule>>,
        view_tx: watch::Sender<Option<BoardView>>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let clock = Arc::clone(&self.clock);
        let polling_interval = self.polling_interval;
        let (mut notices, mut changes) = {
            let cache = self.cache.lock().await;
            (cache.bus().subscribe(), cache.gateway().changes())
        };
        let mut mirror_watcher = self.mirror_watcher.take();

        tokio::spawn(async move {
            info!(
                "syncing prayer times every {} seconds",
                polling_interval.as_secs()
            );
            let mut interval = time::interval(polling_interval);

            loop {
                let force = tokio::select! {
                    _ = interval.tick() => false,
                    _ = time::sleep(until_midnight(clock.now())) => {
                        info!("new day, refreshing prayer times");
                        false
                    }
                    notice = notices.recv() => match notice {
                        Ok(notice) => {
                            debug!("change notice {:?}", notice.dataset);
                            true
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!("missed {} change notices", missed);
                            true
                        }
                        Err(RecvError::Closed) => return,
                    },
                    change = changes.recv() => match change {
                        Ok(RowChange::Reload) => {
                            info!("reload requested");
                            true
                        }
                        Ok(RowChange::Row { table, kind }) => {
                            debug!("{:?} on {}", kind, table);
                            true
                        }
                        Err(RecvError::Lagged(_)) => true,
                        Err(RecvError::Closed) => return,
                    },
                    Some(()) = mirror_changed(&mut mirror_watcher) => {
                        // Own writes leave the mirror equal to memory
                        if !cache.lock().await.reload_mirror().await {
                            continue;
                        }
                        info!("mirror rewritten by another process, reloading");
                        true
                    }
                };

                let view = refresh(&mut *cache.lock().await, force).await;

                schedule_tx.send_if_modified(|current| {
                    if current.as_ref() == Some(&view.schedule) {
                        return false;
                    }
                    *current = Some(view.schedule.clone());
                    true
                });
                view_tx.send_replace(Some(view));
            }
        })
    }

    fn start_display_task(&self, mut view_rx: watch::Receiver<Option<BoardView>>) -> JoinHandle<()> {
        let clock = Arc::clone(&self.clock);

        tokio::spawn(async move {
            loop {
                let view = view_rx.borrow_and_update().clone();
                if let Some(view) = view {
                    let now = clock.now();
                    let entries = evaluate(&view.schedule.day, view.schedule.jummah.as_ref(), now);
                    println!("{}\n", format_board(&entries, &view.hadith, now));
                }

                tokio::select! {
                    _ = time::sleep(until_next_minute(clock.now())) => {}
                    changed = view_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::ManualClock,
        error::GatewayError,
        gateway::MockGateway,
        prayers::{DailyHadith, JummahSetting, PrayerDay},
    };
    use tempfile::TempDir;

    async fn cache(gateway: MockGateway, dir: &TempDir) -> PrayerCache<MockGateway> {
        PrayerCache::new(
            gateway,
            MirrorStore::new(mirror_path(dir.path())),
            ChangeBus::new(BUS_CAPACITY),
            Arc::new(ManualClock::at("2024-06-14 12:00")),
            CacheSettings {
                ttl: Duration::from_secs(300),
                request_timeout: Duration::from_secs(5),
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_refresh_builds_view() {
        let dir = TempDir::new().unwrap();
        let mut gateway = MockGateway::new();
        gateway.expect_list_days().returning(|_| {
            Ok(vec![PrayerDay {
                id: Some("1".to_owned()),
                date: "2024-06-14".to_owned(),
                sehri_end: "03:10".to_owned(),
                zuhr_jamat: "13:30".to_owned(),
                ..Default::default()
            }])
        });
        gateway.expect_get_jummah().returning(|| {
            Ok(Some(JummahSetting {
                first_jamat: "13:45".to_owned(),
                second_jamat: None,
            }))
        });
        gateway.expect_list_daily_hadiths().returning(|_| {
            Ok(vec![DailyHadith {
                id: None,
                day_of_month: 14,
                month: None,
                text: "Fourteenth".to_owned(),
                source: String::new(),
            }])
        });
        gateway.expect_list_hadiths().returning(|| Ok(vec![]));

        let mut cache = cache(gateway, &dir).await;
        let view = refresh(&mut cache, false).await;

        assert_eq!(view.schedule.day.id.as_deref(), Some("1"));
        assert_eq!(
            view.schedule.jummah.map(|j| j.first_jamat).as_deref(),
            Some("13:45")
        );
        assert_eq!(view.hadith.text, "Fourteenth");
    }

    #[tokio::test]
    async fn test_refresh_offline_shows_defaults() {
        let dir = TempDir::new().unwrap();
        let offline = || GatewayError::Unavailable("offline".to_owned());
        let mut gateway = MockGateway::new();
        gateway.expect_list_days().returning(move |_| Err(offline()));
        gateway.expect_get_jummah().returning(move || Err(offline()));
        gateway
            .expect_list_daily_hadiths()
            .returning(move |_| Err(offline()));
        gateway.expect_list_hadiths().returning(move || Err(offline()));

        let mut cache = cache(gateway, &dir).await;
        let view = refresh(&mut cache, true).await;

        assert_eq!(view.schedule.day.date, "2024-06-14");
        assert_eq!(view.schedule.day.day, "Friday");
        assert_eq!(view.schedule.jummah, None);
        assert!(!view.hadith.text.is_empty());
    }

    #[tokio::test]
    async fn test_mirror_change_from_other_process_wakes_sync() {
        let dir = TempDir::new().unwrap();
        let path = mirror_path(dir.path());
        let mut watcher = Some(MirrorWatcher::new(&path).unwrap());

        let mut gateway = MockGateway::new();
        gateway
            .expect_upsert_jummah()
            .returning(|setting| Ok(setting.clone()));
        let mut board_cache = cache(MockGateway::new(), &dir).await;
        let mut admin_cache = cache(gateway, &dir).await;

        admin_cache
            .set_jummah(&JummahSetting {
                first_jamat: "13:45".to_owned(),
                second_jamat: None,
            })
            .await
            .unwrap();

        let woke = time::timeout(Duration::from_secs(5), mirror_changed(&mut watcher)).await;
        assert_eq!(woke.unwrap(), Some(()));
        assert!(board_cache.reload_mirror().await);
    }

    #[tokio::test]
    async fn test_no_watcher_never_wakes() {
        let woke = time::timeout(Duration::from_millis(20), mirror_changed(&mut None)).await;
        assert!(woke.is_err());
    }

    #[test]
    fn test_noop_keep_awake() {
        let keep_awake: Box<dyn KeepAwake> = Box::new(NoopKeepAwake);
        keep_awake.acquire();
        keep_awake.release();
    }
}
