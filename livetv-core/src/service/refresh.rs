//! Refresh coordination
//!
//! One refresh cycle fetches all three sources in parallel, merges them and
//! publishes a new [`Snapshot`] into the cache. Cycles never overlap: they
//! run under a single lock, and triggers that arrive during a cycle are
//! queued, collapsed and served by one more cycle afterwards.
//!
//! A cycle with fewer input channels than `refresh.min_source_channels`
//! leaves the published snapshot untouched, and so does one whose merged
//! catalog falls below that minimum while a non-empty catalog is published.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::merge::merge;
use super::verifier::StreamVerifier;
use crate::cache::CacheManager;
use crate::config::{CatalogConfig, Config, VerificationMode};
use crate::models::{CatalogManifest, Channel, FilterPolicy, MergedMeta, Snapshot, Stream};
use crate::source::SourceFetcher;
use crate::{Error, Result};

/// Queued triggers beyond this are coalesced into the pending ones
const TRIGGER_QUEUE: usize = 8;

/// Why a refresh cycle runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Interval,
    OverlayChanged,
    /// Manual invalidation; the cached stream directory is dropped first
    Forced,
    /// First read against an empty cache
    ColdStart,
}

impl RefreshTrigger {
    /// Combine two pending triggers into the one the cycle should honour
    #[must_use]
    pub fn coalesce(self, other: Self) -> Self {
        match (self, other) {
            (Self::Forced, _) | (_, Self::Forced) => Self::Forced,
            // A cold start may skip the cycle; anything else must not
            (kept, Self::ColdStart) => kept,
            (_, later) => later,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Fetching,
    Merging,
    Published { generation: u64 },
    FailedKeepStale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published { generation: u64, channels: usize },
    /// Not enough input; the previous snapshot stays published
    KeptStale { reason: String },
    /// A cold-start cycle found a snapshot already published
    Current { generation: u64 },
}

/// Produces the snapshot for a cold cache
#[async_trait]
pub trait SnapshotLoader: Send + Sync {
    async fn load_snapshot(&self) -> Result<Arc<Snapshot>>;
}

/// Sends triggers to a running coordinator loop
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<RefreshTrigger>,
}

impl RefreshHandle {
    /// Queue a trigger. Returns `false` only once the loop has stopped.
    ///
    /// A full queue already guarantees another cycle, so the trigger is
    /// dropped as coalesced.
    pub fn trigger(&self, trigger: RefreshTrigger) -> bool {
        match self.tx.try_send(trigger) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(?trigger, "Refresh already pending, trigger coalesced");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the loop behind this handle has stopped
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl From<mpsc::Sender<RefreshTrigger>> for RefreshHandle {
    fn from(tx: mpsc::Sender<RefreshTrigger>) -> Self {
        Self { tx }
    }
}

pub struct RefreshCoordinator {
    fetcher: Arc<dyn SourceFetcher>,
    cache: CacheManager,
    verifier: Option<StreamVerifier>,
    policy: FilterPolicy,
    catalog: CatalogConfig,
    stream_directory_ttl: Duration,
    min_source_channels: usize,
    interval: Duration,
    debounce: Duration,
    /// Held for the whole cycle; guards the generation counter
    cycle: Mutex<u64>,
    state: watch::Sender<RefreshState>,
}

impl RefreshCoordinator {
    /// `verifier` is only used when verification runs in eager mode.
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn SourceFetcher>,
        cache: CacheManager,
        verifier: Option<StreamVerifier>,
    ) -> Self {
        let verifier = verifier.filter(|_| config.verification.mode == VerificationMode::Eager);
        let (state, _) = watch::channel(RefreshState::Idle);

        Self {
            fetcher,
            cache,
            verifier,
            policy: FilterPolicy::from_config(&config.filter),
            catalog: config.catalog.clone(),
            stream_directory_ttl: config.sources.stream_directory_ttl(),
            min_source_channels: config.refresh.min_source_channels,
            interval: config.refresh.interval(),
            debounce: config.custom.debounce(),
            cycle: Mutex::new(0),
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> RefreshState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    /// Start the trigger loop: one cycle right away, then on every interval
    /// tick and every queued trigger until `shutdown` fires.
    pub fn spawn(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> (RefreshHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(TRIGGER_QUEUE);
        let coordinator = Arc::clone(self);
        let task = tokio::spawn(async move { coordinator.run(rx, shutdown).await });
        (RefreshHandle { tx }, task)
    }

    async fn run(&self, mut rx: mpsc::Receiver<RefreshTrigger>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_seconds = self.interval.as_secs(),
            "Refresh loop started"
        );

        loop {
            let mut trigger = tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => RefreshTrigger::Interval,
                Some(trigger) = rx.recv() => trigger,
            };

            if trigger == RefreshTrigger::OverlayChanged {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(self.debounce) => {}
                }
            }

            while let Ok(pending) = rx.try_recv() {
                trigger = trigger.coalesce(pending);
            }

            if let Err(e) = self.refresh(trigger).await {
                tracing::error!(?trigger, error = %e, "Refresh cycle failed");
            }
        }

        tracing::info!("Refresh loop stopped");
    }

    /// Run one refresh cycle now, waiting for any cycle in progress first.
    ///
    /// Fails only when nothing could be published and no earlier snapshot
    /// exists.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Result<RefreshOutcome> {
        let mut generation = self.cycle.lock().await;

        if trigger == RefreshTrigger::ColdStart {
            if let Some(current) = self.cache.current_snapshot().await {
                return Ok(RefreshOutcome::Current {
                    generation: current.generation,
                });
            }
        }

        tracing::debug!(?trigger, "Refresh cycle starting");
        self.state.send_replace(RefreshState::Fetching);

        if trigger == RefreshTrigger::Forced {
            self.cache
                .streams
                .invalidate(&self.cache.keys.stream_directory())
                .await;
        }

        let (remote_channels, remote_streams, overlay) = tokio::join!(
            self.remote_channels(),
            self.remote_streams(),
            self.fetcher.fetch_custom_overlay(),
        );

        let input_channels = remote_channels.len() + overlay.channels.len();
        if input_channels < self.min_source_channels {
            return self
                .keep_stale(format!(
                    "{input_channels} input channels, need at least {}",
                    self.min_source_channels
                ))
                .await;
        }

        self.state.send_replace(RefreshState::Merging);

        let mut channels: Vec<Channel> = Vec::with_capacity(input_channels);
        channels.extend(remote_channels.iter().cloned());
        channels.extend(overlay.channels);

        let mut streams: Vec<Stream> =
            Vec::with_capacity(remote_streams.len() + overlay.streams.len());
        streams.extend(remote_streams.iter().cloned());
        streams.extend(overlay.streams);

        if let Some(verifier) = &self.verifier {
            streams = self.verify_candidates(verifier, &channels, streams).await;
        }

        let metas = merge(channels, &streams, &self.policy, &self.catalog);
        if metas.len() < self.min_source_channels {
            if let Some(current) = self.cache.current_snapshot().await {
                if !current.is_empty() {
                    return self
                        .keep_stale(format!(
                            "merged catalog has {} channels, published one has {}",
                            metas.len(),
                            current.len()
                        ))
                        .await;
                }
            }
        }

        let manifest = CatalogManifest::build(
            &self.catalog,
            &self.groups(&metas),
            &overlay.custom_genres,
        );

        *generation += 1;
        let snapshot = Snapshot::new(*generation, metas, overlay.custom_genres, manifest);
        let published = snapshot.len();
        self.cache
            .snapshots
            .set(&self.cache.keys.snapshot(), Arc::new(snapshot), Duration::ZERO)
            .await;

        self.state.send_replace(RefreshState::Published {
            generation: *generation,
        });
        tracing::info!(
            ?trigger,
            generation = *generation,
            input_channels,
            channels = published,
            "Catalog snapshot published"
        );
        self.state.send_replace(RefreshState::Idle);

        Ok(RefreshOutcome::Published {
            generation: *generation,
            channels: published,
        })
    }

    async fn keep_stale(&self, reason: String) -> Result<RefreshOutcome> {
        self.state.send_replace(RefreshState::FailedKeepStale);

        let outcome = match self.cache.current_snapshot().await {
            Some(current) => {
                tracing::error!(
                    generation = current.generation,
                    reason = %reason,
                    "Refresh produced too few channels, keeping previous snapshot"
                );
                Ok(RefreshOutcome::KeptStale { reason })
            }
            None => {
                tracing::error!(reason = %reason, "Refresh produced too few channels, nothing to serve");
                Err(Error::RefreshFailed(reason))
            }
        };

        self.state.send_replace(RefreshState::Idle);
        outcome
    }

    /// Live channel directory, or the last good copy when the fetch fails
    async fn remote_channels(&self) -> Arc<Vec<Channel>> {
        let last_good = self.cache.keys.channel_directory_last_good();

        match self.fetcher.fetch_remote_channels().await {
            Ok(channels) => {
                let channels = Arc::new(channels);
                self.cache
                    .channels
                    .set(&last_good, channels.clone(), Duration::ZERO)
                    .await;
                channels
            }
            Err(e) => {
                let fallback = self.cache.channels.get(&last_good).await;
                tracing::warn!(
                    source = %e.feed,
                    error = %e,
                    fallback_channels = fallback.as_ref().map_or(0, |c| c.len()),
                    "Channel directory unavailable, using last good copy"
                );
                fallback.unwrap_or_default()
            }
        }
    }

    /// Cached stream directory, re-fetched once its TTL lapses
    async fn remote_streams(&self) -> Arc<Vec<Stream>> {
        let keys = &self.cache.keys;
        let fetch = async {
            let streams = self.fetcher.fetch_remote_streams().await?;
            Ok::<_, Error>(Arc::new(streams))
        };

        match self
            .cache
            .streams
            .populate(&keys.stream_directory(), self.stream_directory_ttl, fetch)
            .await
        {
            Ok(streams) => {
                self.cache
                    .streams
                    .set(&keys.stream_directory_last_good(), streams.clone(), Duration::ZERO)
                    .await;
                streams
            }
            Err(e) => {
                let fallback = self.cache.streams.get(&keys.stream_directory_last_good()).await;
                tracing::warn!(
                    source = "stream directory",
                    error = %e,
                    fallback_streams = fallback.as_ref().map_or(0, |s| s.len()),
                    "Stream directory unavailable, using last good copy"
                );
                fallback.unwrap_or_default()
            }
        }
    }

    /// Probe only streams whose channel can pass the policy
    async fn verify_candidates(
        &self,
        verifier: &StreamVerifier,
        channels: &[Channel],
        streams: Vec<Stream>,
    ) -> Vec<Stream> {
        let candidates: HashSet<&str> = channels
            .iter()
            .filter(|c| self.policy.admits(c))
            .map(|c| c.id.as_str())
            .collect();

        let (probe, skip): (Vec<Stream>, Vec<Stream>) = streams
            .into_iter()
            .partition(|s| candidates.contains(s.channel.as_str()));
        let probed = probe.len();

        let reachable = verifier.retain_reachable(probe).await;
        tracing::debug!(
            probed,
            reachable = reachable.len(),
            skipped = skip.len(),
            "Eager stream verification finished"
        );
        reachable
    }

    /// Catalog groupings: the configured countries, or every country served
    fn groups(&self, metas: &[MergedMeta]) -> Vec<String> {
        let countries: BTreeSet<String> = if self.policy.include_countries.is_empty() {
            metas
                .iter()
                .filter(|m| !m.country.is_empty())
                .map(|m| m.country.clone())
                .collect()
        } else {
            self.policy.include_countries.iter().cloned().collect()
        };
        countries.into_iter().collect()
    }
}

#[async_trait]
impl SnapshotLoader for RefreshCoordinator {
    async fn load_snapshot(&self) -> Result<Arc<Snapshot>> {
        self.refresh(RefreshTrigger::ColdStart).await?;
        self.cache
            .current_snapshot()
            .await
            .ok_or_else(|| Error::RefreshFailed("no snapshot published".to_string()))
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("state", &self.state())
            .field("interval", &self.interval)
            .field("eager_verification", &self.verifier.is_some())
            .finish()
    }
}
