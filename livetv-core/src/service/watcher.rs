//! Custom overlay file watch
//!
//! Polls the overlay file's modification time and size. Appearing,
//! disappearing and changing all count as a change and queue an
//! [`RefreshTrigger::OverlayChanged`]; the coordinator debounces them.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::refresh::{RefreshHandle, RefreshTrigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

#[derive(Debug, Clone)]
pub struct OverlayWatcher {
    path: PathBuf,
    poll_interval: Duration,
}

impl OverlayWatcher {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spawn(
        self,
        handle: RefreshHandle,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(handle, shutdown).await })
    }

    async fn run(self, handle: RefreshHandle, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last = fingerprint(&self.path).await;
        tracing::info!(
            path = %self.path.display(),
            present = last.is_some(),
            poll_seconds = self.poll_interval.as_secs_f64(),
            "Watching custom overlay file"
        );

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if handle.is_closed() {
                tracing::debug!("Refresh loop gone, stopping overlay watch");
                break;
            }

            let current = fingerprint(&self.path).await;
            if current == last {
                continue;
            }
            last = current;

            tracing::info!(path = %self.path.display(), "Custom overlay file changed");
            if !handle.trigger(RefreshTrigger::OverlayChanged) {
                tracing::debug!("Refresh loop gone, stopping overlay watch");
                break;
            }
        }
    }
}

async fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some(Fingerprint {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}
