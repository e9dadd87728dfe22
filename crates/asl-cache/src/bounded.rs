use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::{CacheError, CacheResult};

/// Point-in-time counters for one cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Thread-safe, fixed-capacity LRU map.
///
/// Lookups and inserts are O(1). Inserting a new key into a full cache
/// evicts the least-recently-touched entry; a lookup hit counts as a touch.
/// The lock is never held across an `.await`, so callers can share one
/// cache between any number of tasks.
pub struct BoundedCache<K, V> {
    name: &'static str,
    entries: Mutex<LruCache<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(name: &'static str, capacity: usize) -> CacheResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity { name })?;
        Ok(Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up an entry, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.entries.lock().get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Look up an entry without touching its recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries.lock().peek(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains(key)
    }

    /// Insert or replace an entry. Returns the key evicted to make room, if any.
    pub fn insert(&self, key: K, value: V) -> Option<K> {
        let mut entries = self.entries.lock();
        let replacing = entries.contains(&key);
        let displaced = entries.push(key, value);
        drop(entries);

        match displaced {
            Some((evicted, _)) if !replacing => {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                trace!(cache = self.name, "evicted least-recently-used entry");
                Some(evicted)
            }
            _ => None,
        }
    }

    /// Drop an entry explicitly.
    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.entries.lock().pop(key)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let (len, capacity) = {
            let entries = self.entries.lock();
            (entries.len(), entries.cap().get())
        };
        CacheStats {
            len,
            capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result.
    ///
    /// Only a successful fetch populates the cache. If `fetch` fails, or the
    /// returned future is dropped before completing, the cache is untouched.
    /// Two tasks missing on the same key concurrently may both fetch; the
    /// later insert simply replaces the earlier one.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}
