//! Announcement watcher
//!
//! Polls the announcement endpoint and publishes an announcement only when its
//! content changes.

use crate::transport::ApiClient;
use gatekeep_types::CoreEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Polls for announcements and remembers the last one published
#[derive(Clone)]
pub struct AnnouncementWatcher {
    api: ApiClient,
    cached: Arc<Mutex<Option<String>>>,
    event_tx: broadcast::Sender<CoreEvent>,
}

impl AnnouncementWatcher {
    pub fn new(api: ApiClient, event_tx: broadcast::Sender<CoreEvent>) -> Self {
        Self {
            api,
            cached: Arc::new(Mutex::new(None)),
            event_tx,
        }
    }

    /// Poll once. Returns the announcement if it was new and got published.
    pub async fn poll_once(&self) -> Option<String> {
        let content = match self.api.get_announcement().await {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Announcement poll failed");
                return None;
            }
        };

        if content.is_empty() {
            return None;
        }

        {
            let mut cached = self.cached.lock();
            if cached.as_deref() == Some(content.as_str()) {
                debug!("Announcement unchanged");
                return None;
            }
            *cached = Some(content.clone());
        }

        info!("New announcement");
        let _ = self.event_tx.send(CoreEvent::Announcement {
            content: content.clone(),
        });
        Some(content)
    }

    /// Last announcement published
    pub fn cached(&self) -> Option<String> {
        self.cached.lock().clone()
    }

    /// Poll now and then every `period` until stopped
    pub fn spawn(self, period: Duration) -> AnnouncementHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = period.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.poll_once().await;
                    }
                    _ = stop_rx.changed() => {
                        debug!("Announcement watcher stopped");
                        return;
                    }
                }
            }
        });

        AnnouncementHandle { stop_tx, task }
    }
}

/// Owner's handle to a running announcement watcher. Dropping it stops polling.
pub struct AnnouncementHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AnnouncementHandle {
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}
