use std::collections::HashMap;

use parking_lot::Mutex;

use super::region::{Region, RegionCache};
use super::segment::RegionSegment;

struct Entry {
    cache: RegionCache,
    last_access: u64,
}

struct Inner {
    cache: HashMap<Region, Entry>,
    max_size: usize,
    access_counter: u64,
}

impl Inner {
    fn evict_lru_if_needed(&mut self) {
        while self.cache.len() >= self.max_size {
            let Some(lru_key) = self
                .cache
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            self.cache.remove(&lru_key);
        }
    }
}

/// LRU cache of region data, guarded by a single non-reentrant lock.
/// The recency structure uses a per-entry access counter scanned with
/// `min_by_key` rather than an intrusive linked list, which keeps the
/// eviction path allocation-free at the cache sizes this crate deals in.
pub struct RegionCacheManager {
    inner: Mutex<Inner>,
}

impl RegionCacheManager {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { cache: HashMap::new(), max_size: max_size.max(1), access_counter: 0 }),
        }
    }

    pub fn cache_region(&self, cache: RegionCache) {
        let mut inner = self.inner.lock();
        inner.evict_lru_if_needed();
        inner.access_counter += 1;
        let tick = inner.access_counter;
        let region = cache.source_region.clone();
        inner.cache.insert(region, Entry { cache, last_access: tick });
    }

    pub fn cache_segment(&self, segment: &RegionSegment) {
        if let Some(cache) = &segment.cache {
            self.cache_region(cache.clone());
        }
    }

    /// Blocking get: always acquires the lock.
    pub fn get_cached_region(&self, region: &Region) -> Option<RegionCache> {
        let mut inner = self.inner.lock();
        inner.access_counter += 1;
        let tick = inner.access_counter;
        if let Some(entry) = inner.cache.get_mut(region) {
            entry.last_access = tick;
            entry.cache.mark_accessed();
            Some(entry.cache.clone())
        } else {
            None
        }
    }

    /// `try_lock`-style get: if the lock is contended, declines rather
    /// than blocking and reports a miss, to avoid deadlocking with a
    /// holder already inside its own critical section.
    pub fn get_cached_segment(&self, segment: &RegionSegment) -> Option<RegionCache> {
        let Some(mut inner) = self.inner.try_lock() else {
            log::warn!("RegionCacheManager: try_lock declined, treating as cache miss");
            return None;
        };
        inner.access_counter += 1;
        let tick = inner.access_counter;
        if let Some(entry) = inner.cache.get_mut(&segment.source_region) {
            entry.last_access = tick;
            entry.cache.mark_accessed();
            Some(entry.cache.clone())
        } else {
            None
        }
    }

    pub fn get_segment_with_cache(&self, segment: &RegionSegment) -> RegionSegment {
        let mut out = segment.clone();
        if let Some(cache) = self.get_cached_segment(segment) {
            out.cache = Some(cache);
        }
        out
    }

    pub fn clear(&self) {
        self.inner.lock().cache.clear();
    }

    pub fn size(&self) -> usize {
        self.inner.lock().cache.len()
    }

    pub fn max_size(&self) -> usize {
        self.inner.lock().max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::DataVariant;

    fn cache_for(start: u64, end: u64) -> RegionCache {
        RegionCache::new(vec![DataVariant::F64(vec![0.0; (end - start + 1) as usize])], Region::new(vec![start], vec![end]))
    }

    #[test]
    fn lru_eviction_keeps_recently_accessed() {
        let mgr = RegionCacheManager::new(3);
        mgr.cache_region(cache_for(0, 0)); // R1
        mgr.cache_region(cache_for(1, 1)); // R2
        mgr.cache_region(cache_for(2, 2)); // R3

        // touch R1 so it's most-recently-used
        assert!(mgr.get_cached_region(&Region::new(vec![0], vec![0])).is_some());

        mgr.cache_region(cache_for(3, 3)); // R4, should evict R2

        assert!(mgr.get_cached_region(&Region::new(vec![1], vec![1])).is_none());
        assert!(mgr.get_cached_region(&Region::new(vec![0], vec![0])).is_some());
        assert!(mgr.get_cached_region(&Region::new(vec![2], vec![2])).is_some());
        assert!(mgr.get_cached_region(&Region::new(vec![3], vec![3])).is_some());
        assert_eq!(mgr.size(), 3);
    }

    #[test]
    fn every_surviving_entry_has_been_accessed_once() {
        let mgr = RegionCacheManager::new(2);
        mgr.cache_region(cache_for(0, 0));
        let got = mgr.get_cached_region(&Region::new(vec![0], vec![0])).unwrap();
        assert!(got.access_count >= 1);
    }
}
