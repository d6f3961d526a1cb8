//! # Read-Through Cache
//!
//! Process-lifetime keyed cache over remote reads: the first `get` for a key
//! runs the supplied async loader and stores the result, later `get`s return
//! the stored value without touching the network.
//!
//! # Single-Flight Guarantee
//! Each key owns a `tokio::sync::Mutex` slot and the loader runs while that
//! slot is held. Two concurrent `get`s for one key therefore share a single
//! outstanding load: the second caller parks on the slot lock and, once the
//! first load settles, observes the stored entry instead of fetching again.
//!
//! # Failure Semantics
//! Loader failures are never cached. A failed load leaves any previous entry
//! for the key untouched and propagates the error to the caller; there is no
//! automatic retry.

use crate::backend::BackendError;
use crate::engine::error::SyncError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A cached value plus the instant it was fetched or written.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn now(value: V) -> Self {
        Self {
            value,
            fetched_at: Utc::now(),
        }
    }
}

struct Slot<V> {
    entry: tokio::sync::Mutex<Option<CacheEntry<V>>>,
}

impl<V> Slot<V> {
    fn empty() -> Self {
        Self {
            entry: tokio::sync::Mutex::new(None),
        }
    }
}

/// Keyed read-through cache with per-key single-flight loads.
///
/// Writers go through `write_through`, `invalidate`, or `force_refresh`
/// only, so readers always observe an unchanged, fully refreshed, or
/// explicitly written value, never a torn intermediate state.
pub struct ReadThroughCache<K, V> {
    slots: Mutex<HashMap<K, Arc<Slot<V>>>>,
}

impl<K, V> Default for ReadThroughCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ReadThroughCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &K) -> Arc<Slot<V>> {
        let mut slots = self.slots.lock().unwrap();
        slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::empty()))
            .clone()
    }

    /// Returns the cached value for `key`, running `loader` on a miss.
    pub async fn get<F, Fut>(&self, key: &K, loader: F) -> Result<V, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, BackendError>>,
    {
        let slot = self.slot(key);
        let mut entry = slot.entry.lock().await;
        if let Some(cached) = entry.as_ref() {
            debug!(?key, "cache hit");
            return Ok(cached.value.clone());
        }
        debug!(?key, "cache miss, loading");
        let value = loader().await?;
        *entry = Some(CacheEntry::now(value.clone()));
        Ok(value)
    }

    /// Bypasses the cache, loads unconditionally, and overwrites the entry
    /// on success. On failure the previous entry survives and the error is
    /// surfaced as [`SyncError::StaleRead`].
    pub async fn force_refresh<F, Fut>(&self, key: &K, loader: F) -> Result<V, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, BackendError>>,
    {
        let slot = self.slot(key);
        let mut entry = slot.entry.lock().await;
        debug!(?key, "forced refresh");
        match loader().await {
            Ok(value) => {
                *entry = Some(CacheEntry::now(value.clone()));
                Ok(value)
            }
            Err(source) if entry.is_some() => Err(SyncError::StaleRead {
                key: format!("{key:?}"),
                source,
            }),
            Err(source) => Err(SyncError::Transport(source)),
        }
    }

    /// Evicts the entry for `key`; the next `get` performs a fresh load.
    ///
    /// A load already in flight for the key completes against the detached
    /// slot, which nothing reads afterwards.
    pub fn invalidate(&self, key: &K) {
        debug!(?key, "invalidated");
        self.slots.lock().unwrap().remove(key);
    }

    /// Stores `value` for `key` without a network round trip. Used right
    /// after a successful commit or a local merge.
    pub async fn write_through(&self, key: &K, value: V) {
        let slot = self.slot(key);
        let mut entry = slot.entry.lock().await;
        debug!(?key, "write-through");
        *entry = Some(CacheEntry::now(value));
    }

    /// Reads the current entry without triggering a load.
    pub async fn peek(&self, key: &K) -> Option<CacheEntry<V>> {
        let slot = {
            let slots = self.slots.lock().unwrap();
            slots.get(key).cloned()
        };
        match slot {
            Some(slot) => slot.entry.lock().await.clone(),
            None => None,
        }
    }

    /// Drops every entry. Session end / logout.
    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_loader(
        calls: Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send>>
    {
        move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(value.to_string())
            })
        }
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_load() {
        let cache = ReadThroughCache::<String, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "appointments:all".to_string();

        let (a, b) = tokio::join!(
            cache.get(&key, counting_loader(calls.clone(), "rows")),
            cache.get(&key, counting_loader(calls.clone(), "rows")),
        );

        assert_eq!(a.unwrap(), "rows");
        assert_eq!(b.unwrap(), "rows");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hit_after_miss_skips_loader() {
        let cache = ReadThroughCache::<String, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "patient:p1".to_string();

        cache
            .get(&key, counting_loader(calls.clone(), "alice"))
            .await
            .unwrap();
        let again = cache
            .get(&key, counting_loader(calls.clone(), "alice"))
            .await
            .unwrap();

        assert_eq!(again, "alice");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache = ReadThroughCache::<String, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "pendencies:all".to_string();

        cache
            .get(&key, counting_loader(calls.clone(), "v1"))
            .await
            .unwrap();
        cache.invalidate(&key);
        let reloaded = cache
            .get(&key, counting_loader(calls.clone(), "v2"))
            .await
            .unwrap();

        assert_eq!(reloaded, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let cache = ReadThroughCache::<String, String>::new();
        let key = "appointments:p9".to_string();

        let err = cache
            .get(&key, || async { Err(BackendError::Transport("reset".into())) })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::Transport(BackendError::Transport("reset".into()))
        );

        // The failure left no entry behind, so the next get loads for real.
        let value = cache
            .get(&key, || async { Ok("recovered".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "recovered");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_entry() {
        let cache = ReadThroughCache::<String, String>::new();
        let key = "appointments:all".to_string();

        cache.write_through(&key, "stable".to_string()).await;

        let err = cache
            .force_refresh(&key, || async {
                Err(BackendError::Transport("flaky link".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::StaleRead { .. }));

        let kept = cache.peek(&key).await.expect("entry should survive");
        assert_eq!(kept.value, "stable");
    }

    #[tokio::test]
    async fn write_through_overwrites_without_loading() {
        let cache = ReadThroughCache::<String, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "patient:p2".to_string();

        cache
            .get(&key, counting_loader(calls.clone(), "old"))
            .await
            .unwrap();
        cache.write_through(&key, "new".to_string()).await;

        let value = cache
            .get(&key, counting_loader(calls.clone(), "never"))
            .await
            .unwrap();
        assert_eq!(value, "new");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
