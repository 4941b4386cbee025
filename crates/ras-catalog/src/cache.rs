//! Per-run cache of model footprints.
//!
//! A model's perimeter footprint is needed once for the model collection and
//! again for every realization's results item. Failed computations are
//! cached as `None` so a broken geometry file is read (and reported) once.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use projection::Footprint;

/// Counters for the footprint cache.
#[derive(Debug, Default)]
pub struct FootprintCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl FootprintCacheStats {
    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

/// LRU of footprints keyed by model key base.
pub struct FootprintCache {
    cache: RwLock<LruCache<String, Option<Footprint>>>,
    stats: FootprintCacheStats,
}

impl FootprintCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
            stats: FootprintCacheStats::default(),
        }
    }

    /// Cached outcome for a model: `Some(None)` records a failed computation.
    pub async fn get(&self, model_key: &str) -> Option<Option<Footprint>> {
        let mut cache = self.cache.write().await;
        match cache.get(model_key) {
            Some(footprint) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(footprint.clone())
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn put(&self, model_key: &str, footprint: Option<Footprint>) {
        let mut cache = self.cache.write().await;
        if let Some((evicted, _)) = cache.push(model_key.to_string(), footprint) {
            if evicted != model_key {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(model = %evicted, "Evicted cached footprint");
            }
        }
    }

    pub fn stats(&self) -> &FootprintCacheStats {
        &self.stats
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }
}
