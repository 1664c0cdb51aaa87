//! Kernel row cache
//!
//! The solver asks for whole rows of the Q matrix. Rows are computed on a
//! miss and kept in an LRU cache whose capacity follows the configured
//! memory budget. Rows are shared as `Arc<[Qfloat]>` so the solver can hold
//! two of them while the cache evicts others.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Storage type for Q matrix entries
pub type Qfloat = f32;

/// LRU cache of Q matrix rows keyed by variable index
pub struct KernelCache {
    cache: LruCache<usize, Arc<[Qfloat]>>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a cache holding at most `capacity` rows
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache sized from a budget in megabytes for rows of `row_len` entries.
    ///
    /// At least two rows always fit, since every solver step touches two.
    pub fn with_memory_limit(megabytes: usize, row_len: usize) -> Self {
        let bytes = megabytes.saturating_mul(1 << 20);
        let row_bytes = row_len.max(1) * std::mem::size_of::<Qfloat>();
        Self::new((bytes / row_bytes).max(2))
    }

    /// Get a cached row
    pub fn get(&mut self, i: usize) -> Option<Arc<[Qfloat]>> {
        if let Some(row) = self.cache.get(&i) {
            self.hits += 1;
            Some(Arc::clone(row))
        } else {
            self.misses += 1;
            None
        }
    }

    /// Store a row
    pub fn put(&mut self, i: usize, row: Arc<[Qfloat]>) {
        self.cache.put(i, row);
    }

    /// Return the cached row for `i`, computing and storing it on a miss
    pub fn get_or_compute<F>(&mut self, i: usize, compute: F) -> Arc<[Qfloat]>
    where
        F: FnOnce() -> Vec<Qfloat>,
    {
        if let Some(row) = self.get(i) {
            return row;
        }
        let row: Arc<[Qfloat]> = compute().into();
        self.put(i, Arc::clone(&row));
        row
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
