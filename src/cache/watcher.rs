//! Notices of mirror writes made by other minbar processes.
//!
//! Admin commands run as their own process and share the data directory with
//! the board. Their writes reach the board through the mirror file, which is
//! watched here.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Watches the mirror file for changes.
///
/// The parent directory is watched so that replacing the file through a
/// rename is seen too. Own writes are reported as well; telling them apart is
/// left to [`crate::cache::PrayerCache::reload_mirror`].
pub struct MirrorWatcher {
    // Notifications stop when the watcher is dropped
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<()>,
}

impl MirrorWatcher {
    /// Starts watching `mirror`, its directory must exist.
    pub fn new(mirror: &Path) -> notify::Result<Self> {
        let file_name: Option<OsString> = mirror.file_name().map(|name| name.to_os_string());
        let dir: PathBuf = match mirror.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        return;
                    }
                    let touches_mirror = event
                        .paths
                        .iter()
                        .any(|path| path.file_name() == file_name.as_deref());
                    if touches_mirror && tx.send(()).is_err() {
                        debug!("mirror watcher receiver dropped");
                    }
                }
                Err(e) => warn!("mirror watch error: {}", e),
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!("watching {} for mirror changes", dir.display());

        Ok(MirrorWatcher {
            _watcher: watcher,
            events,
        })
    }

    /// Waits for the next change, a burst of events counts once.
    pub async fn changed(&mut self) -> Option<()> {
        self.events.recv().await?;
        while self.events.try_recv().is_ok() {}
        Some(())
    }
}
