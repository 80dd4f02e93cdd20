//! Read operations against the published snapshot
//!
//! Nothing here fails: a cold cache that cannot be populated, an unknown
//! id or a malformed grouping all answer with an empty result.

use std::sync::Arc;
use std::time::Duration;

use super::refresh::SnapshotLoader;
use super::verifier::StreamVerifier;
use crate::cache::CacheManager;
use crate::models::{CatalogManifest, GenreFilter, MergedMeta, Snapshot, StreamDescriptor};

#[derive(Clone)]
pub struct QueryService {
    cache: CacheManager,
    loader: Arc<dyn SnapshotLoader>,
    /// Present in lazy verification mode only
    verifier: Option<StreamVerifier>,
    id_prefix: String,
}

impl QueryService {
    pub fn new(
        cache: CacheManager,
        loader: Arc<dyn SnapshotLoader>,
        verifier: Option<StreamVerifier>,
        id_prefix: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            loader,
            verifier,
            id_prefix: id_prefix.into(),
        }
    }

    /// Channels of one grouping, optionally narrowed by genre.
    ///
    /// The grouping may be given as a catalog id (`iptv-GR`) or a bare
    /// code (`GR`, `gr`). With lazy verification, channels whose streams
    /// have all already failed a probe are left out; listing never probes.
    #[tracing::instrument(skip(self, genre))]
    pub async fn list_catalog(&self, group: &str, genre: Option<&GenreFilter>) -> Vec<MergedMeta> {
        let Some(group) = self.group_key(group) else {
            tracing::debug!(group = %group, "Ignoring blank catalog grouping");
            return Vec::new();
        };
        let Some(snapshot) = self.snapshot().await else {
            return Vec::new();
        };

        let mut metas: Vec<MergedMeta> = snapshot
            .metas
            .iter()
            .filter(|m| m.has_genre(group))
            .filter(|m| genre.is_none_or(|g| g.matches(m)))
            .cloned()
            .collect();

        if let Some(verifier) = &self.verifier {
            let mut live = Vec::with_capacity(metas.len());
            for meta in metas {
                if !known_unreachable(verifier, &meta).await {
                    live.push(meta);
                }
            }
            metas = live;
        }

        tracing::debug!(group = %group, results = metas.len(), "Catalog listed");
        metas
    }

    /// One channel by prefixed or bare id; `None` when unknown.
    ///
    /// With lazy verification the meta only lists reachable streams, and a
    /// meta left without any is reported as absent.
    #[tracing::instrument(skip(self))]
    pub async fn get_meta(&self, id: &str) -> Option<MergedMeta> {
        let snapshot = self.snapshot().await?;
        let mut meta = self.lookup(&snapshot, id)?.clone();

        if let Some(verifier) = &self.verifier {
            let total = meta.streams.len();
            meta.streams = verifier.retain_reachable(meta.streams).await;
            if meta.streams.is_empty() {
                tracing::debug!(id = %meta.id, streams = total, "No reachable stream, hiding channel");
                return None;
            }
        }

        Some(meta)
    }

    /// Playable streams of one channel; empty when unknown.
    pub async fn get_streams(&self, id: &str) -> Vec<StreamDescriptor> {
        self.get_meta(id)
            .await
            .map(|meta| meta.streams)
            .unwrap_or_default()
    }

    /// Descriptor published with the current snapshot
    pub async fn manifest(&self) -> Option<CatalogManifest> {
        self.snapshot().await.map(|s| s.manifest.clone())
    }

    /// Current snapshot, populating a cold cache through the loader
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        let key = self.cache.keys.snapshot();
        match self
            .cache
            .snapshots
            .populate(&key, Duration::ZERO, self.loader.load_snapshot())
            .await
        {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "No catalog snapshot available");
                None
            }
        }
    }

    fn lookup<'a>(&self, snapshot: &'a Snapshot, id: &str) -> Option<&'a MergedMeta> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        snapshot
            .get(id)
            .or_else(|| snapshot.get(&format!("{}{id}", self.id_prefix)))
    }

    fn group_key<'a>(&self, group: &'a str) -> Option<&'a str> {
        let group = group.trim();
        let bare = match group.get(..self.id_prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(&self.id_prefix) => &group[self.id_prefix.len()..],
            _ => group,
        };
        let bare = bare.trim();
        (!bare.is_empty()).then_some(bare)
    }
}

/// Every stream of `meta` already has a cached failed probe
async fn known_unreachable(verifier: &StreamVerifier, meta: &MergedMeta) -> bool {
    for stream in &meta.streams {
        match verifier.cached(&stream.url).await {
            Some(entry) if !entry.reachable => {}
            _ => return false,
        }
    }
    !meta.streams.is_empty()
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("id_prefix", &self.id_prefix)
            .field("lazy_verification", &self.verifier.is_some())
            .finish()
    }
}
