use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::container::{ProcessingState, SignalSourceContainer};
use crate::processing::DataProcessor;
use crate::region::OrganizedRegion;

use super::region_base::RegionProcessorBase;

/// Mutates the organized-region list in place: reorder, add, or drop
/// entries in response to runtime conditions the container can't express
/// through its static region groups alone.
pub type ReorganizeCallback = Arc<dyn Fn(&mut Vec<OrganizedRegion>, &Arc<dyn SignalSourceContainer>) + Send + Sync>;

/// Evaluated once per cycle to decide whether a reorganization is due,
/// independent of any explicit `request_reorganization` call.
pub type AutoCriterion = Arc<dyn Fn(&[OrganizedRegion], &Arc<dyn SignalSourceContainer>) -> bool + Send + Sync>;

/// Region processor whose organization can change between cycles: a
/// host-supplied callback rebuilds `organized_regions` either on demand
/// or when an auto-criterion fires, and the active cursor is repaired
/// to keep tracking the same playback position afterward.
pub struct DynamicRegionProcessor {
    base: RegionProcessorBase,
    reorganize: RwLock<Option<ReorganizeCallback>>,
    auto_criterion: RwLock<Option<AutoCriterion>>,
    trigger_reorganization: AtomicBool,
    reorganize_count: std::sync::atomic::AtomicU64,
}

impl DynamicRegionProcessor {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            base: RegionProcessorBase::new(cache_capacity),
            reorganize: RwLock::new(None),
            auto_criterion: RwLock::new(None),
            trigger_reorganization: AtomicBool::new(false),
            reorganize_count: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn base(&self) -> &RegionProcessorBase {
        &self.base
    }

    pub fn set_reorganize_callback(&self, callback: ReorganizeCallback) {
        *self.reorganize.write() = Some(callback);
    }

    pub fn set_auto_criterion(&self, criterion: AutoCriterion) {
        *self.auto_criterion.write() = Some(criterion);
    }

    /// Asks for a reorganization on the next `process` call. Idempotent:
    /// calling it twice before a cycle runs has the same effect as once.
    pub fn request_reorganization(&self) {
        self.trigger_reorganization.store(true, Ordering::Release);
    }

    pub fn reorganize_count(&self) -> u64 {
        self.reorganize_count.load(Ordering::Acquire)
    }

    fn should_reorganize(&self, container: &Arc<dyn SignalSourceContainer>) -> bool {
        if self.trigger_reorganization.swap(false, Ordering::AcqRel) {
            return true;
        }
        let Some(criterion) = self.auto_criterion.read().clone() else {
            return false;
        };
        let regions = self.base.organized_regions.read();
        criterion(&regions, container)
    }

    fn current_primary_position(&self) -> Option<Vec<u64>> {
        let regions = self.base.organized_regions.read();
        let index = self.base.current_region_index().min(regions.len().saturating_sub(1));
        regions.get(index).map(|r| r.current_position.clone())
    }

    fn repair_cursor(&self, previous_position: Option<Vec<u64>>) {
        let new_index = previous_position
            .as_deref()
            .and_then(|pos| self.base.find_region_for_position(pos))
            .unwrap_or(0);
        self.base.set_current_region_index(new_index);
    }
}

impl DataProcessor for DynamicRegionProcessor {
    fn on_attach(&self, container: Arc<dyn SignalSourceContainer>) {
        self.base.organize_from_groups(&container);
        self.base.set_current_region_index(0);
    }

    fn on_detach(&self, _container: Arc<dyn SignalSourceContainer>) {
        self.base.organized_regions.write().clear();
        self.base.set_current_region_index(0);
        self.trigger_reorganization.store(false, Ordering::Release);
    }

    fn process(&self, container: Arc<dyn SignalSourceContainer>) {
        if !container.begin_processing_cycle() {
            return;
        }
        self.base.processing.store(true, Ordering::Release);

        if self.should_reorganize(&container) {
            let previous_position = self.current_primary_position();
            if let Some(callback) = self.reorganize.read().clone() {
                let mut regions = self.base.organized_regions.write();
                callback(&mut regions, &container);
            } else {
                self.base.organize_from_groups(&container);
            }
            self.repair_cursor(previous_position);
            self.reorganize_count.fetch_add(1, Ordering::AcqRel);
        }

        let region_count = self.base.organized_regions.read().len();
        if region_count == 0 {
            let _ = container.update_processing_state(ProcessingState::Processed);
            self.base.processing.store(false, Ordering::Release);
            return;
        }
        let index = self.base.current_region_index().min(region_count - 1);

        let source_region = {
            let regions = self.base.organized_regions.read();
            regions[index].get_active_segment().map(|s| s.source_region.clone())
        };

        if let Some(region) = source_region {
            match container.get_region_data(&region) {
                Ok(data) => {
                    container.set_processed_data(data);
                    let _ = container.update_processing_state(ProcessingState::Processed);
                }
                Err(err) => {
                    log::error!("DynamicRegionProcessor: {err}");
                    let _ = container.update_processing_state(ProcessingState::Error);
                }
            }
        } else {
            let _ = container.update_processing_state(ProcessingState::Processed);
        }

        self.base.processing.store(false, Ordering::Release);
    }

    fn is_processing(&self) -> bool {
        self.base.processing.load(Ordering::Acquire)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::audio::AudioStreamContainer;
    use crate::region::{Region, RegionGroup};
    use crate::structure::Organization;
    use crate::variant::DataVariant;

    fn container_with_one_region() -> Arc<dyn SignalSourceContainer> {
        let data = vec![DataVariant::F64((0..20).map(|x| x as f64).collect())];
        let container: Arc<dyn SignalSourceContainer> =
            Arc::new(AudioStreamContainer::new(Organization::Interleaved, 10, 2, data, 48_000.0).unwrap());
        let mut group = RegionGroup::new("g");
        group.add_region(Region::time_span(0, 9, 2));
        container.add_region_group(group);
        container
    }

    #[test]
    fn explicit_request_triggers_exactly_one_reorganization() {
        let container = container_with_one_region();
        let processor = DynamicRegionProcessor::new(8);
        processor.on_attach(container.clone());
        processor.request_reorganization();
        processor.process(container.clone());
        assert_eq!(processor.reorganize_count(), 1);
        processor.process(container.clone());
        assert_eq!(processor.reorganize_count(), 1);
    }

    #[test]
    fn callback_can_drop_regions_and_cursor_falls_back_to_zero() {
        let container = container_with_one_region();
        let processor = DynamicRegionProcessor::new(8);
        processor.on_attach(container.clone());
        processor.set_reorganize_callback(Arc::new(|regions: &mut Vec<OrganizedRegion>, _c| {
            regions.clear();
        }));
        processor.request_reorganization();
        processor.process(container.clone());
        assert_eq!(processor.base().current_region_index(), 0);
        assert_eq!(container.get_processing_state(), ProcessingState::Processed);
    }
}
