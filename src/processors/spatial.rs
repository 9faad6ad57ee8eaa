use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::container::{ProcessingState, SignalSourceContainer};
use crate::coord::extract_region_f64;
use crate::processing::DataProcessor;
use crate::structure::DimensionRole;
use crate::variant::DataVariant;

use super::region_base::RegionProcessorBase;

/// Container-neutral extractor for spatial (non-time-organized) data: it
/// reads the whole surface out of `processed_data[0]` and slices one
/// `DataVariant` per active region, in group-iteration order. Regions
/// are never auto-advanced — a spatial surface has no read head to move.
pub struct SpatialRegionProcessor {
    base: RegionProcessorBase,
    identifications: RwLock<Vec<(String, usize)>>,
    auto_cache: bool,
    attached: AtomicBool,
}

impl SpatialRegionProcessor {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            base: RegionProcessorBase::new(cache_capacity),
            identifications: RwLock::new(Vec::new()),
            auto_cache: false,
            attached: AtomicBool::new(false),
        }
    }

    pub fn with_auto_cache(mut self, auto_cache: bool) -> Self {
        self.auto_cache = auto_cache;
        self
    }

    pub fn base(&self) -> &RegionProcessorBase {
        &self.base
    }

    /// Identifiers for the most recent `process` output, one pair per
    /// entry of the returned `Vec<DataVariant>`, in the same order.
    pub fn region_identifications(&self) -> Vec<(String, usize)> {
        self.identifications.read().clone()
    }

    fn has_spatial_dimension(container: &Arc<dyn SignalSourceContainer>) -> bool {
        container.dimensions().iter().any(|d| {
            matches!(d.role, DimensionRole::SpatialX | DimensionRole::SpatialY | DimensionRole::SpatialZ)
        })
    }

    /// Re-syncs the organized region list from the container's current
    /// group map. Safe to call between frames on a container whose
    /// regions change without a full detach/attach cycle.
    pub fn refresh(&self, container: &Arc<dyn SignalSourceContainer>) {
        self.base.organize_from_groups(container);
    }
}

impl DataProcessor for SpatialRegionProcessor {
    fn on_attach(&self, container: Arc<dyn SignalSourceContainer>) {
        if !Self::has_spatial_dimension(&container) {
            log::error!("SpatialRegionProcessor: container has no spatial dimension, attach aborted");
            return;
        }
        self.base.organize_from_groups(&container);
        self.attached.store(true, Ordering::Release);
    }

    fn on_detach(&self, _container: Arc<dyn SignalSourceContainer>) {
        self.base.organized_regions.write().clear();
        self.identifications.write().clear();
        self.attached.store(false, Ordering::Release);
    }

    fn process(&self, container: Arc<dyn SignalSourceContainer>) {
        if !self.attached.load(Ordering::Acquire) || !container.begin_processing_cycle() {
            return;
        }
        self.base.processing.store(true, Ordering::Release);

        let surface = container.get_processed_data();
        let Some(template) = surface.first() else {
            self.identifications.write().clear();
            container.set_processed_data(Vec::new());
            let _ = container.update_processing_state(ProcessingState::Processed);
            self.base.processing.store(false, Ordering::Release);
            return;
        };

        if template.is_empty() {
            self.identifications.write().clear();
            let _ = container.update_processing_state(ProcessingState::Processed);
            self.base.processing.store(false, Ordering::Release);
            return;
        }

        let dims = container.dimensions();
        let layout = container.memory_layout();
        let flat = template.as_f64_vec();

        let regions = self.base.organized_regions.read().clone();
        let mut outputs = Vec::with_capacity(regions.len());
        let mut ids = Vec::with_capacity(regions.len());

        for region in &regions {
            for segment in &region.segments {
                let values = extract_region_f64(
                    &flat,
                    &segment.source_region.start_coordinates,
                    &segment.source_region.end_coordinates,
                    &dims,
                    layout,
                );
                if self.auto_cache {
                    self.base.cache_region_if_needed(segment, vec![template.like_with_values(values.clone())]);
                }
                outputs.push(template.like_with_values(values));
                ids.push((region.group_name.clone(), region.region_index));
            }
        }

        *self.identifications.write() = ids;
        container.set_processed_data(outputs);
        let _ = container.update_processing_state(ProcessingState::Processed);
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
    use crate::structure::{DataDimension, MemoryLayout, Modality, Organization, StructureDescriptor};

    fn image_container(width: u64, height: u64) -> Arc<dyn SignalSourceContainer> {
        let data = vec![DataVariant::F64((0..(width * height)).map(|x| x as f64).collect())];
        let container: Arc<dyn SignalSourceContainer> =
            Arc::new(AudioStreamContainer::new(Organization::Planar, 1, 1, data, 48_000.0).unwrap());
        let dims = vec![
            DataDimension::new("y", height, 1, DimensionRole::SpatialY),
            DataDimension::new("x", width, 1, DimensionRole::SpatialX),
        ];
        let structure = StructureDescriptor::new(Modality::Image2D, Organization::Planar, MemoryLayout::RowMajor, dims).unwrap();
        container.set_structure(structure);
        container
    }

    #[test]
    fn on_attach_rejects_container_without_spatial_dims() {
        let data = vec![DataVariant::F64(vec![0.0; 10])];
        let container: Arc<dyn SignalSourceContainer> =
            Arc::new(AudioStreamContainer::new(Organization::Interleaved, 10, 1, data, 48_000.0).unwrap());
        let processor = SpatialRegionProcessor::new(8);
        processor.on_attach(container.clone());
        assert!(processor.base().organized_regions().is_empty());
    }

    #[test]
    fn extracts_one_output_per_region_with_matching_identifications() {
        let container = image_container(4, 4);
        let mut group = RegionGroup::new("tiles");
        group.add_region(Region::image_rect(0, 0, 2, 2));
        group.add_region(Region::image_rect(2, 2, 2, 2));
        container.add_region_group(group);

        let processor = SpatialRegionProcessor::new(8);
        processor.on_attach(container.clone());
        container.set_processed_data(vec![DataVariant::F64((0..16).map(|x| x as f64).collect())]);
        processor.process(container.clone());

        let output = container.get_processed_data();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].as_f64_vec().len(), 4);
        let ids = processor.region_identifications();
        assert_eq!(ids, vec![("tiles".to_string(), 0), ("tiles".to_string(), 1)]);
    }
}
