use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bizsite_core::events::{CacheEvent, EventBus};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, OnceCell};

use crate::error::ClientError;

type Slot = Arc<OnceCell<Result<Value, ClientError>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Drop cached reads when the dashboard regains focus. Off: admin data
    /// stays fresh across tab switches and is only refreshed by explicit
    /// invalidation.
    pub revalidate_on_focus: bool,
    /// Completed reads kept before the least recently used is dropped.
    pub max_entries: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            revalidate_on_focus: false,
            max_entries: 256,
        }
    }
}

struct Entry {
    slot: Slot,
    last_used: u64,
}

/// What the cache holds for a key right now.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Missing,
    Pending,
    Ready(Result<Value, ClientError>),
}

/// Read cache keyed by fully-resolved URL. Concurrent reads of one key share
/// a single request; entries live until invalidated or until
/// `max_entries` newer keys push them out. Failed reads are not kept.
pub struct QueryCache {
    entries: DashMap<String, Entry>,
    clock: AtomicU64,
    bus: EventBus,
    options: CacheOptions,
}

impl QueryCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            entries: DashMap::new(),
            clock: AtomicU64::new(0),
            bus: EventBus::default(),
            options,
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Cached value for `key`, or the result of `fetch` shared with any
    /// concurrent caller of the same key.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Value, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ClientError>>,
    {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        let slot: Slot = {
            let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
                slot: Slot::default(),
                last_used: tick,
            });
            entry.last_used = tick;
            entry.slot.clone()
        };
        self.evict_beyond_capacity(key);

        let result = slot.get_or_init(fetch).await.clone();
        if result.is_err() {
            self.entries
                .remove_if(key, |_, current| Arc::ptr_eq(&current.slot, &slot));
        }
        result
    }

    /// Drop least recently used completed entries until the cache fits.
    /// Pending reads and `keep` are never dropped.
    fn evict_beyond_capacity(&self, keep: &str) {
        while self.entries.len() > self.options.max_entries {
            let oldest = self
                .entries
                .iter()
                .filter(|e| e.key() != keep && e.value().slot.initialized())
                .min_by_key(|e| e.value().last_used)
                .map(|e| e.key().clone());
            let Some(oldest) = oldest else { break };
            self.entries.remove(&oldest);
            tracing::debug!(key = %oldest, "cache entry evicted");
        }
    }

    pub fn lookup(&self, key: &str) -> CacheLookup {
        match self.entries.get(key) {
            None => CacheLookup::Missing,
            Some(entry) => match entry.slot.get() {
                None => CacheLookup::Pending,
                Some(result) => CacheLookup::Ready(result.clone()),
            },
        }
    }

    /// Drop `key` and tell subscribers. Returns whether anything was cached.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        tracing::debug!(key, removed, "cache key invalidated");
        self.bus.publish(CacheEvent::invalidated(key));
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.bus.publish(CacheEvent::Cleared);
    }

    /// Focus hook for the dashboard shell. Returns whether the cache was
    /// dropped.
    pub fn on_focus(&self) -> bool {
        if self.options.revalidate_on_focus {
            self.clear();
            true
        } else {
            false
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.bus.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}
