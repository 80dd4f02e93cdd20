//! Engine assembly and dependency injection

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cache::{CacheManager, KeyBuilder};
use crate::config::VerificationMode;
use crate::resilience::TimeoutConfig;
use crate::service::{
    OverlayWatcher, QueryService, RefreshCoordinator, RefreshHandle, StreamVerifier,
};
use crate::source::{HttpSourceFetcher, SourceFetcher};
use crate::Config;

/// Container for the initialized engine components
#[derive(Clone)]
pub struct Engine {
    pub cache: CacheManager,
    pub coordinator: Arc<RefreshCoordinator>,
    pub query: QueryService,
    pub verifier: StreamVerifier,
    watcher: Option<OverlayWatcher>,
}

/// Background tasks started by [`Engine::start`]
#[derive(Debug)]
pub struct EngineTasks {
    pub handle: RefreshHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineTasks {
    /// Wait for every background task to finish
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Engine task ended abnormally");
            }
        }
    }
}

/// Build the engine with the HTTP source fetcher
pub fn init_engine(config: &Config) -> Result<Engine, anyhow::Error> {
    let fetcher = HttpSourceFetcher::new(&config.sources, &config.custom, timeouts(config))?;
    info!("Source fetcher initialized");

    init_engine_with_fetcher(config, Arc::new(fetcher))
}

/// Build the engine around any [`SourceFetcher`]
pub fn init_engine_with_fetcher(
    config: &Config,
    fetcher: Arc<dyn SourceFetcher>,
) -> Result<Engine, anyhow::Error> {
    let cache = CacheManager::new(KeyBuilder::default(), config.cache.max_capacity);
    info!("Cache stores initialized (verification capacity: {})", config.cache.max_capacity);

    let verifier = StreamVerifier::new(&config.verification, timeouts(config), &cache)?;
    let (eager, lazy) = match config.verification.mode {
        VerificationMode::Off => (None, None),
        VerificationMode::Lazy => (None, Some(verifier.clone())),
        VerificationMode::Eager => (Some(verifier.clone()), None),
    };
    info!("Stream verifier initialized ({:?} mode)", config.verification.mode);

    let coordinator = Arc::new(RefreshCoordinator::new(config, fetcher, cache.clone(), eager));
    info!("Refresh coordinator initialized");

    let query = QueryService::new(
        cache.clone(),
        coordinator.clone(),
        lazy,
        config.catalog.id_prefix.clone(),
    );

    let watcher = config
        .custom
        .file_path
        .as_ref()
        .filter(|_| config.custom.enabled)
        .map(|path| OverlayWatcher::new(path, config.custom.poll_interval()));

    Ok(Engine {
        cache,
        coordinator,
        query,
        verifier,
        watcher,
    })
}

fn timeouts(config: &Config) -> TimeoutConfig {
    TimeoutConfig::new()
        .with_fetch_timeout(config.sources.fetch_timeout())
        .with_probe_timeout(config.verification.timeout())
}

impl Engine {
    /// Start the refresh loop and, when an overlay file is configured, its
    /// watcher. Both stop when `shutdown` is cancelled.
    pub fn start(&self, shutdown: CancellationToken) -> EngineTasks {
        let (handle, refresh_task) = self.coordinator.spawn(shutdown.clone());
        let mut tasks = vec![refresh_task];

        if let Some(watcher) = self.watcher.clone() {
            tasks.push(watcher.spawn(handle.clone(), shutdown));
        }

        info!(tasks = tasks.len(), "Engine started");
        EngineTasks { handle, tasks }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("coordinator", &self.coordinator)
            .field("query", &self.query)
            .field("watcher", &self.watcher)
            .finish()
    }
}
