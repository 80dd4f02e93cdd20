use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{CatalogManifest, MergedMeta};

/// The merged catalog produced by one successful refresh.
///
/// Snapshots are immutable once built; a newer refresh replaces the whole
/// value in the cache, never a part of it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub metas: Vec<MergedMeta>,
    pub custom_genres: Vec<String>,
    pub manifest: CatalogManifest,
    index: HashMap<String, usize>,
}

impl Snapshot {
    #[must_use]
    pub fn new(
        generation: u64,
        metas: Vec<MergedMeta>,
        custom_genres: Vec<String>,
        manifest: CatalogManifest,
    ) -> Self {
        let index = metas
            .iter()
            .enumerate()
            .map(|(pos, meta)| (meta.id.clone(), pos))
            .collect();

        Self {
            generation,
            created_at: Utc::now(),
            metas,
            custom_genres,
            manifest,
            index,
        }
    }

    /// Exact lookup by prefixed meta id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MergedMeta> {
        self.index.get(id).and_then(|pos| self.metas.get(*pos))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }
}
