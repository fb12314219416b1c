//! In-process change notifications.
//!
//! Every successful write publishes a [`ChangeNotice`] naming the record set
//! that changed. Subscribers re-fetch what they need; the notice never
//! carries the changed rows.

use log::debug;
use tokio::sync::broadcast;

/// Record sets a notice can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSet {
    PrayerDays,
    Jummah,
    Hadith,
    /// Everything, e.g. after a reload signal.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice {
    pub dataset: DataSet,
}

/// Publish/subscribe bus for [`ChangeNotice`]s, cheap to clone.
#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeNotice>,
}

impl ChangeBus {
    /// Create a new bus buffering up to `capacity` notices per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        ChangeBus { tx }
    }

    /// Publishes a notice, ignoring the absence of subscribers.
    pub fn publish(&self, dataset: DataSet) {
        if let Ok(count) = self.tx.send(ChangeNotice { dataset }) {
            debug!("published {:?} change to {} subscribers", dataset, count);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.tx.subscribe()
    }
}
