use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use get_size::GetSize;
use moka::{notification::RemovalCause, policy::EvictionPolicy, sync::Cache};
use tracing::debug;
use volslicer_core::{SliceIndex, SliceResponse};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
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

/// Client side slice cache for one slicer instance.
///
/// Unbounded by default. With a capacity, the least recently used index is evicted
/// first; lookups and inserts both count as use.
pub struct SliceCache {
    inner: Cache<SliceIndex, Arc<SliceResponse>>,
    capacity: Option<usize>,
    hits: u64,
    misses: u64,
    inserts: u64,
    evictions: Arc<AtomicU64>,
}

impl SliceCache {
    /// `capacity` of `Some(0)` is treated as 1.
    pub fn new(capacity: Option<usize>) -> Self {
        let capacity = capacity.map(|c| c.max(1));
        let evictions = Arc::new(AtomicU64::new(0));

        let mut builder = Cache::builder().eviction_listener({
            let evictions = evictions.clone();
            move |index: Arc<SliceIndex>, _, cause| {
                if cause == RemovalCause::Size {
                    evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(index = %index, "Evicted slice from cache");
                }
            }
        });
        if let Some(capacity) = capacity {
            builder = builder
                .max_capacity(capacity as u64)
                .eviction_policy(EvictionPolicy::lru());
        }

        Self {
            inner: builder.build(),
            capacity,
            hits: 0,
            misses: 0,
            inserts: 0,
            evictions,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            inserts: self.inserts,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Heap bytes held by the cached payloads.
    pub fn memory_used(&self) -> usize {
        self.inner
            .iter()
            .map(|(_, response)| response.get_heap_size())
            .sum()
    }

    pub fn contains(&self, index: SliceIndex) -> bool {
        self.inner.contains_key(&index)
    }

    /// Looks up an index, counting a hit or a miss.
    pub fn get(&mut self, index: SliceIndex) -> Option<Arc<SliceResponse>> {
        let found = self.inner.get(&index);
        match found {
            Some(_) => self.hits += 1,
            None => self.misses += 1,
        }
        found
    }

    /// Like [`SliceCache::get`], without counting a hit or a miss.
    pub fn peek(&self, index: SliceIndex) -> Option<Arc<SliceResponse>> {
        self.inner.get(&index)
    }

    /// Stores a response under its own index. Returns whether the cache changed.
    pub fn insert(&mut self, response: SliceResponse) -> bool {
        let index = response.index;
        let changed = match self.inner.get(&index) {
            Some(cached) => *cached != response,
            None => true,
        };
        if changed {
            self.inserts += 1;
            self.inner.insert(index, Arc::new(response));
        }
        // Apply pending evictions so `len` and the eviction count are exact.
        self.inner.run_pending_tasks();
        changed
    }

    pub fn clear(&mut self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
    }

    pub fn indices(&self) -> impl Iterator<Item = SliceIndex> + '_ {
        self.inner.iter().map(|(index, _)| *index)
    }
}

impl fmt::Debug for SliceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
