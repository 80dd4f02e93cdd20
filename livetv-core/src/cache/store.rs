//! Keyed in-memory store with per-entry lifetimes
//!
//! Backed by a Moka future cache. Each entry carries its own TTL (a zero
//! TTL never expires), and `populate` runs its loader through an
//! `async_singleflight` group so concurrent misses on one key share one load.
//! Values are only ever inserted whole, so readers see either the previous
//! value or the new one.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_singleflight::Group;
use moka::Expiry;

use crate::{Error, Result};

#[derive(Clone)]
struct Cached<V> {
    value: V,
    ttl: Option<Duration>,
}

impl<V> Cached<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            ttl: (!ttl.is_zero()).then_some(ttl),
        }
    }
}

/// Expiry policy reading the TTL stored alongside each value
struct PerEntryTtl;

impl<V> Expiry<String, Cached<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Cached<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Cached<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Typed cache store shared by the refresh and query paths
#[derive(Clone)]
pub struct CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    name: &'static str,
    entries: moka::future::Cache<String, Cached<V>>,
    flights: Arc<Group<String, V, Error>>,
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store holding at most `max_capacity` entries.
    ///
    /// `name` only appears in logs.
    #[must_use]
    pub fn new(name: &'static str, max_capacity: u64) -> Self {
        let entries = moka::future::Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            name,
            entries,
            flights: Arc::new(Group::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let hit = self.entries.get(key).await.map(|cached| cached.value);
        tracing::trace!(store = self.name, key = %key, hit = hit.is_some(), "Cache lookup");
        hit
    }

    /// Insert or replace a value. A zero `ttl` means no automatic expiry.
    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        self.entries
            .insert(key.to_string(), Cached::new(value, ttl))
            .await;
        tracing::debug!(
            store = self.name,
            key = %key,
            ttl_seconds = ttl.as_secs(),
            "Cache entry stored"
        );
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
        tracing::debug!(store = self.name, key = %key, "Cache entry invalidated");
    }

    /// Return the cached value, or run `factory` and cache its result.
    ///
    /// Only the first of several concurrent callers for `key` polls its
    /// factory; the others wait and receive the same value or error. A
    /// failed factory caches nothing. If a value was `set` for `key` while
    /// the factory ran, that value is kept and returned instead.
    pub async fn populate<Fut>(&self, key: &str, ttl: Duration, factory: Fut) -> Result<V>
    where
        Fut: Future<Output = Result<V>> + Send,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let entries = self.entries.clone();
        let owned_key = key.to_string();
        let name = self.name;

        let flight = async move {
            // A leader that finished just before we joined already stored it
            if let Some(cached) = entries.get(&owned_key).await {
                return Ok(cached.value);
            }

            tracing::debug!(store = name, key = %owned_key, "Cache miss, populating");
            let value = factory.await?;
            // Never replace a value someone else published meanwhile
            let entry = entries
                .entry(owned_key)
                .or_insert(Cached::new(value, ttl))
                .await;
            Ok::<_, Error>(entry.into_value().value)
        };

        // `None` means the leading caller was dropped before finishing
        self.flights
            .work(key, flight)
            .await
            .map_err(|failed| {
                failed.unwrap_or_else(|| {
                    Error::Internal(format!("cache population for '{key}' was abandoned"))
                })
            })
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
        tracing::debug!(store = self.name, "Cache store cleared");
    }
}

impl<V> std::fmt::Debug for CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("name", &self.name)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn store() -> CacheStore<u32> {
        CacheStore::new("test", 100)
    }

    #[tokio::test]
    async fn test_set_get_invalidate() {
        let store = store();
        assert!(store.get("a").await.is_none());

        store.set("a", 1, Duration::ZERO).await;
        assert_eq!(store.get("a").await, Some(1));

        store.set("a", 2, Duration::ZERO).await;
        assert_eq!(store.get("a").await, Some(2));

        store.invalidate("a").await;
        assert!(store.get("a").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_independently() {
        let store = store();
        store.set("short", 1, Duration::from_millis(50)).await;
        store.set("forever", 2, Duration::ZERO).await;
        store.set("long", 3, Duration::from_secs(3600)).await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(store.get("short").await.is_none());
        assert_eq!(store.get("forever").await, Some(2));
        assert_eq!(store.get("long").await, Some(3));
    }

    #[tokio::test]
    async fn test_update_replaces_ttl() {
        let store = store();
        store.set("k", 1, Duration::from_millis(50)).await;
        store.set("k", 2, Duration::ZERO).await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.get("k").await, Some(2));
    }

    #[tokio::test]
    async fn test_populate_runs_factory_once_for_concurrent_callers() {
        let store = Arc::new(store());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = vec![];
        for _ in 0..10 {
            let store = store.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                store
                    .populate("snapshot", Duration::ZERO, async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Later callers hit the cache without running their factory
        let value = store
            .populate("snapshot", Duration::ZERO, async {
                Err(Error::Internal("should not run".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_populate_failure_caches_nothing() {
        let store = store();

        let result = store
            .populate("streams", Duration::ZERO, async {
                Err(Error::RefreshFailed("down".to_string()))
            })
            .await;
        assert!(matches!(result, Err(Error::RefreshFailed(_))));
        assert!(store.get("streams").await.is_none());

        let value = store
            .populate("streams", Duration::ZERO, async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_populate_keeps_value_published_meanwhile() {
        let store = store();
        let inner = store.clone();

        let value = store
            .populate("snapshot", Duration::ZERO, async move {
                inner.set("snapshot", 7, Duration::ZERO).await;
                Ok(3)
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(store.get("snapshot").await, Some(7));
    }

    #[tokio::test]
    async fn test_waiter_loads_itself_when_leader_is_dropped() {
        let store = Arc::new(store());

        let leader = tokio::spawn({
            let store = store.clone();
            async move {
                store
                    .populate("streams", Duration::ZERO, async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(1)
                    })
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = tokio::spawn({
            let store = store.clone();
            async move {
                store
                    .populate("streams", Duration::ZERO, async { Ok(9) })
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        leader.abort();

        let value = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(value, 9);
        assert_eq!(store.get("streams").await, Some(9));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = store();
        store.set("a", 1, Duration::ZERO).await;
        store.set("b", 2, Duration::ZERO).await;
        store.clear();

        assert!(store.get("a").await.is_none());
        assert!(store.get("b").await.is_none());
    }
}
