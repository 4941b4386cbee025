//! LRU cache of raw raster bytes, bounded by total size.
//!
//! Cataloging a depth grid opens it for georeferencing and then scans it for
//! nodata; the cache lets both passes share one fetch.

use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache counters for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub memory_bytes: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Object bytes keyed by object key, evicted least-recently-used first.
pub struct ObjectCache {
    cache: LruCache<String, Bytes>,
    memory_limit: usize,
    current_memory: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ObjectCache {
    /// Create a cache holding at most `memory_limit` bytes.
    pub fn new(memory_limit: usize) -> Self {
        Self {
            cache: LruCache::unbounded(),
            memory_limit,
            current_memory: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cache holding at most `entries` objects of any size.
    pub fn with_capacity(entries: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(entries),
            memory_limit: usize::MAX,
            current_memory: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<Bytes> {
        if let Some(data) = self.cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(data.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Insert an object. Objects larger than the whole budget are not cached.
    pub fn insert(&mut self, key: &str, data: Bytes) {
        let size = data.len();
        if size > self.memory_limit {
            return;
        }

        while self.current_memory + size > self.memory_limit && !self.cache.is_empty() {
            self.evict_one();
        }

        // `push` returns the displaced entry: either the old value for this
        // key or the LRU entry dropped for capacity.
        if let Some((old_key, old)) = self.cache.push(key.to_string(), data) {
            self.current_memory = self.current_memory.saturating_sub(old.len());
            if old_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.current_memory += size;
    }

    fn evict_one(&mut self) {
        if let Some((_, evicted)) = self.cache.pop_lru() {
            self.current_memory = self.current_memory.saturating_sub(evicted.len());
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            memory_bytes: self.current_memory as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.current_memory = 0;
    }

    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
