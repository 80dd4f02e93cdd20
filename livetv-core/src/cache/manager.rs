//! Cache manager grouping every store the engine uses
//!
//! Catalog snapshots, directory copies and verification results live in
//! separate stores with independent lifetimes; this type hands them out
//! together with the shared [`KeyBuilder`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{CacheStore, KeyBuilder};
use crate::models::{Channel, Snapshot, Stream, VerificationEntry};

#[derive(Clone)]
pub struct CacheManager {
    pub keys: KeyBuilder,
    pub snapshots: CacheStore<Arc<Snapshot>>,
    pub channels: CacheStore<Arc<Vec<Channel>>>,
    pub streams: CacheStore<Arc<Vec<Stream>>>,
    pub verifications: CacheStore<VerificationEntry>,
}

impl CacheManager {
    /// `verification_capacity` bounds the number of remembered probe results;
    /// the other stores only ever hold a handful of keys.
    #[must_use]
    pub fn new(keys: KeyBuilder, verification_capacity: u64) -> Self {
        Self {
            keys,
            snapshots: CacheStore::new("snapshots", 4),
            channels: CacheStore::new("channel_directory", 4),
            streams: CacheStore::new("stream_directory", 4),
            verifications: CacheStore::new("verifications", verification_capacity),
        }
    }

    /// Current snapshot, if one has been published
    pub async fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.get(&self.keys.snapshot()).await
    }

    /// Drop every cached value, including verification results
    pub fn clear_all(&self) {
        self.snapshots.clear();
        self.channels.clear();
        self.streams.clear();
        self.verifications.clear();
        tracing::debug!("All caches cleared");
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            snapshots: self.snapshots.entry_count(),
            channel_directories: self.channels.entry_count(),
            stream_directories: self.streams.entry_count(),
            verifications: self.verifications.entry_count(),
        }
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(KeyBuilder::default(), 100_000)
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("keys", &self.keys)
            .finish()
    }
}

/// Entry counts per store.
///
/// Moka updates counts lazily, so freshly inserted entries may not show up
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub snapshots: u64,
    pub channel_directories: u64,
    pub stream_directories: u64,
    pub verifications: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::snapshot_of;
    use std::time::Duration;

    #[tokio::test]
    async fn test_current_snapshot_and_clear() {
        let manager = CacheManager::default();
        assert!(manager.current_snapshot().await.is_none());

        let snapshot = Arc::new(snapshot_of(Vec::new()));
        manager
            .snapshots
            .set(&manager.keys.snapshot(), snapshot, Duration::ZERO)
            .await;
        assert!(manager.current_snapshot().await.is_some());

        manager.clear_all();
        assert!(manager.current_snapshot().await.is_none());
    }
}
