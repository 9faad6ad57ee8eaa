use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::container::SignalSourceContainer;
use crate::region::{OrganizedRegion, RegionCache, RegionCacheManager, RegionSegment};
use crate::variant::DataVariant;

/// Default number of cached regions a region-organizing processor
/// keeps before evicting; mirrors the "modest LRU, not a byte budget"
/// sizing used elsewhere in this crate's cache manager.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Shared state composed by every region-organizing processor: a cache
/// manager, the materialized region list, and the active-region cursor.
pub struct RegionProcessorBase {
    pub cache_manager: RegionCacheManager,
    pub organized_regions: RwLock<Vec<OrganizedRegion>>,
    pub current_region_index: AtomicUsize,
    pub processing: AtomicBool,
}

impl RegionProcessorBase {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache_manager: RegionCacheManager::new(cache_capacity.max(1)),
            organized_regions: RwLock::new(Vec::new()),
            current_region_index: AtomicUsize::new(0),
            processing: AtomicBool::new(false),
        }
    }

    pub fn organized_regions(&self) -> Vec<OrganizedRegion> {
        self.organized_regions.read().clone()
    }

    pub fn current_region_index(&self) -> usize {
        self.current_region_index.load(Ordering::Acquire)
    }

    pub fn set_current_region_index(&self, index: usize) {
        self.current_region_index.store(index, Ordering::Release);
    }

    /// Caches `data` for `segment` only when its volume is at most 10%
    /// of the cache's capacity; a segment larger than that would thrash
    /// the LRU set for every other consumer of the cache.
    pub fn cache_region_if_needed(&self, segment: &RegionSegment, data: Vec<DataVariant>) {
        let budget = (self.cache_manager.max_size() / 10).max(1);
        if segment.get_total_elements() as usize <= budget {
            self.cache_manager.cache_region(RegionCache::new(data, segment.source_region.clone()));
        }
    }

    pub fn find_region_for_position(&self, position: &[u64]) -> Option<usize> {
        self.organized_regions.read().iter().position(|r| r.contains_position(position))
    }

    /// Enumerates every region in every group attached to `container`,
    /// wraps each as a single-segment `OrganizedRegion`, carries over
    /// the group's transition/selection policy and attributes, and
    /// sorts the result by the first dimension of each segment's start
    /// coordinate.
    pub fn organize_from_groups(&self, container: &Arc<dyn SignalSourceContainer>) {
        let mut regions = Vec::new();
        for group in container.get_all_region_groups() {
            for (index, region) in group.regions.iter().enumerate() {
                let mut organized = OrganizedRegion::new(group.name.clone(), index);
                organized.transition_type = group.transition_type;
                organized.transition_duration_ms = group.get_region_transition(index);
                organized.selection_pattern = group.selection_pattern;
                for (key, value) in &group.attributes {
                    organized.attributes.insert(key.clone(), value.clone());
                }
                let segment = RegionSegment::new(region.clone());
                organized.current_position = segment.start_coordinates().to_vec();
                organized.segments.push(segment);
                regions.push(organized);
            }
        }
        regions.sort_by_key(|r| r.segments.first().map(|s| s.start_coordinates()[0]).unwrap_or(0));
        *self.organized_regions.write() = regions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::audio::AudioStreamContainer;
    use crate::region::{Region, RegionGroup};
    use crate::structure::Organization;

    #[test]
    fn organizes_every_region_in_every_group_sorted_by_start() {
        let data = vec![DataVariant::F64((0..20).map(|x| x as f64).collect())];
        let container: Arc<dyn SignalSourceContainer> =
            Arc::new(AudioStreamContainer::new(Organization::Interleaved, 10, 2, data, 48_000.0).unwrap());

        let mut group = RegionGroup::new("g");
        group.add_region(Region::time_span(5, 9, 2));
        group.add_region(Region::time_span(0, 4, 2));
        container.add_region_group(group);

        let base = RegionProcessorBase::new(8);
        base.organize_from_groups(&container);
        let regions = base.organized_regions();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].segments[0].start_coordinates()[0], 0);
        assert_eq!(regions[1].segments[0].start_coordinates()[0], 5);
    }
}
