pub mod audio;
pub mod core;
pub mod state;
pub mod stream;
pub mod video;

pub use core::ContainerCore;
pub use state::{ProcessingState, StateChangeCallback};
pub use stream::StreamContainer;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::KakshyaResult;
use crate::processing::chain::DataProcessingChain;
use crate::processing::DataProcessor;
use crate::region::{Region, RegionGroup, RegionSegment};
use crate::structure::{DataDimension, MemoryLayout, StructureDescriptor};
use crate::variant::DataVariant;

/// Capability set satisfied by every container. Concrete containers
/// compose a `ContainerCore` and expose it through `core()`; the default
/// method bodies here delegate to it, splitting the surface into data
/// model, region access, lock-free state, and reader tracking.
pub trait SignalSourceContainer: Send + Sync {
    fn core(&self) -> &ContainerCore;

    fn dimensions(&self) -> Vec<DataDimension> {
        self.core().structure.read().dimensions.clone()
    }

    fn total_elements(&self) -> u64 {
        self.core().structure.read().total_elements()
    }

    fn frame_size(&self) -> u64 {
        self.core().structure.read().frame_size()
    }

    fn num_frames(&self) -> u64 {
        self.core().structure.read().num_frames()
    }

    fn memory_layout(&self) -> MemoryLayout {
        self.core().structure.read().memory_layout
    }

    fn set_memory_layout(&self, layout: MemoryLayout) {
        self.core().structure.write().memory_layout = layout;
    }

    fn structure(&self) -> StructureDescriptor {
        self.core().structure.read().clone()
    }

    fn set_structure(&self, structure: StructureDescriptor) {
        *self.core().structure.write() = structure;
    }

    fn has_data(&self) -> bool {
        self.core().has_data()
    }

    fn clear(&self) {
        self.core().clear()
    }

    fn get_region_data(&self, region: &Region) -> KakshyaResult<Vec<DataVariant>> {
        self.core().get_region_data(region)
    }

    fn set_region_data(&self, region: &Region, data: &[DataVariant]) -> KakshyaResult<()> {
        self.core().set_region_data(region, data)
    }

    /// A single time-slice across every other dimension.
    fn get_frame(&self, frame: u64) -> KakshyaResult<Vec<DataVariant>> {
        self.core().get_frame(frame)
    }

    /// `count` consecutive time-slices across every other dimension.
    fn get_frames(&self, start_frame: u64, count: u64) -> KakshyaResult<Vec<DataVariant>> {
        self.core().get_frames(start_frame, count)
    }

    fn get_value_at(&self, coordinates: &[u64]) -> KakshyaResult<Vec<DataVariant>> {
        self.core().get_value_at(coordinates)
    }

    fn set_value_at(&self, coordinates: &[u64], data: &[DataVariant]) -> KakshyaResult<()> {
        self.core().set_value_at(coordinates, data)
    }

    fn get_region_group_data(&self, group_name: &str) -> KakshyaResult<Vec<Vec<DataVariant>>> {
        self.core().get_region_group_data(group_name)
    }

    fn get_segments_data(&self, segments: &[RegionSegment]) -> KakshyaResult<Vec<Vec<DataVariant>>> {
        self.core().get_segments_data(segments)
    }

    fn is_region_loaded(&self, region: &Region) -> bool {
        self.core().is_region_loaded(region)
    }

    fn load_region(&self, region: &Region) -> KakshyaResult<Vec<DataVariant>> {
        self.core().load_region(region)
    }

    fn unload_region(&self, region: &Region) {
        self.core().unload_region(region)
    }

    fn get_processing_chain(&self) -> Option<Arc<Mutex<DataProcessingChain>>> {
        self.core().get_processing_chain()
    }

    fn set_processing_chain(&self, chain: Option<Arc<Mutex<DataProcessingChain>>>) {
        self.core().set_processing_chain(chain)
    }

    /// Blocks until the container's exclusive-access gate is free, then
    /// takes it. Orthogonal to the interior locks guarding individual
    /// fields — for callers that need several of those fields to stay
    /// consistent across a multi-step operation.
    fn lock(&self) {
        self.core().lock()
    }

    /// Takes the exclusive-access gate without blocking. Returns `false`
    /// if another caller already holds it.
    fn try_lock(&self) -> bool {
        self.core().try_lock()
    }

    fn unlock(&self) {
        self.core().unlock()
    }

    /// Builds a default processor suited to this container's shape. The
    /// contiguous access processor is the universal fallback: it has no
    /// structural precondition beyond non-empty dimensions.
    fn create_default_processor(&self) -> Arc<dyn DataProcessor> {
        Arc::new(crate::processors::contiguous::ContiguousAccessProcessor::new(true))
    }

    fn get_processed_data(&self) -> Vec<DataVariant> {
        self.core().processed_data.read().clone()
    }

    fn set_processed_data(&self, data: Vec<DataVariant>) {
        *self.core().processed_data.write() = data;
    }

    fn with_processed_data_mut(&self, f: &mut dyn FnMut(&mut Vec<DataVariant>)) {
        f(&mut self.core().processed_data.write());
    }

    fn add_region_group(&self, group: RegionGroup) {
        self.core().add_region_group(group)
    }

    fn get_region_group(&self, name: &str) -> Option<RegionGroup> {
        self.core().get_region_group(name)
    }

    fn get_all_region_groups(&self) -> Vec<RegionGroup> {
        self.core().get_all_region_groups()
    }

    fn remove_region_group(&self, name: &str) {
        self.core().remove_region_group(name)
    }

    fn get_processing_state(&self) -> ProcessingState {
        self.core().get_processing_state()
    }

    fn update_processing_state(&self, new_state: ProcessingState) -> KakshyaResult<()> {
        self.core().update_processing_state(new_state)
    }

    fn register_state_change_callback(&self, callback: StateChangeCallback) -> u64 {
        self.core().register_state_change_callback(callback)
    }

    fn unregister_state_change_callback(&self, id: u64) {
        self.core().unregister_state_change_callback(id)
    }

    fn is_ready_for_processing(&self) -> bool {
        self.core().is_ready_for_processing()
    }

    fn mark_ready_for_processing(&self, ready: bool) {
        self.core().mark_ready_for_processing(ready)
    }

    fn register_dimension_reader(&self, dim: usize) -> u64 {
        self.core().register_dimension_reader(dim)
    }

    fn unregister_dimension_reader(&self, dim: usize, reader_id: u64) {
        self.core().unregister_dimension_reader(dim, reader_id)
    }

    fn has_active_readers(&self, dim: usize) -> bool {
        self.core().has_active_readers(dim)
    }

    fn mark_dimension_consumed(&self, dim: usize, reader_id: u64) {
        self.core().mark_dimension_consumed(dim, reader_id)
    }

    fn all_dimensions_consumed(&self) -> bool {
        self.core().all_dimensions_consumed()
    }

    fn reset_processing_token(&self) {
        self.core().reset_processing_token()
    }

    fn try_acquire_processing_token(&self, channel: i64) -> bool {
        self.core().try_acquire_processing_token(channel)
    }

    fn has_processing_token(&self, channel: i64) -> bool {
        self.core().has_processing_token(channel)
    }

    fn get_default_processor(&self) -> Option<std::sync::Arc<dyn crate::processing::processor::DataProcessor>> {
        self.core().get_default_processor()
    }

    fn set_default_processor(&self, processor: Option<std::sync::Arc<dyn crate::processing::processor::DataProcessor>>) {
        self.core().set_default_processor(processor)
    }

    /// Runs the container's default processor against `self_arc`, which
    /// must point at the same object as `self`. Mirrors
    /// `process_default()`'s reliance on the container's own
    /// shared-ownership handle to satisfy `DataProcessor::process`'s
    /// `Arc<dyn SignalSourceContainer>` signature.
    fn process_default(&self, self_arc: std::sync::Arc<dyn SignalSourceContainer>) {
        if let Some(processor) = self.get_default_processor() {
            processor.process(self_arc);
        }
    }

    /// Narrowing capability check: containers that carry a read head
    /// override this to expose it; non-stream containers (e.g. a bare
    /// spatial surface) keep the default `None`.
    fn as_stream_container(&self) -> Option<&dyn StreamContainer> {
        None
    }

    /// Brings the container into `Processing` from wherever a new
    /// cycle may start (`Idle` on first use, `Processed` once new input
    /// has arrived). Returns `false` without changing state if the
    /// container is `Error` or `NeedsRemoval`.
    fn begin_processing_cycle(&self) -> bool {
        let state = self.get_processing_state();
        if matches!(state, ProcessingState::Error | ProcessingState::NeedsRemoval) {
            return false;
        }
        if state != ProcessingState::Ready {
            let _ = self.update_processing_state(ProcessingState::Ready);
        }
        self.update_processing_state(ProcessingState::Processing).is_ok()
    }
}
