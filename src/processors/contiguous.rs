use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::container::{ProcessingState, SignalSourceContainer};
use crate::coord;
use crate::processing::DataProcessor;
use crate::region::Region;
use crate::structure::{convention, DataDimension, DimensionRole, MemoryLayout};

/// Treats a container as per-channel linear streams, each with its own
/// read position, and pulls a fixed-shape window on every cycle.
pub struct ContiguousAccessProcessor {
    dimensions: RwLock<Vec<DataDimension>>,
    memory_layout: RwLock<MemoryLayout>,
    total_elements: AtomicU64,
    looping: AtomicBool,
    loop_region: RwLock<Option<Region>>,
    current_position: RwLock<Vec<u64>>,
    output_shape: RwLock<Vec<u64>>,
    configured_shape: Option<Vec<u64>>,
    auto_advance: bool,
    processing: AtomicBool,
}

impl ContiguousAccessProcessor {
    pub fn new(auto_advance: bool) -> Self {
        Self {
            dimensions: RwLock::new(Vec::new()),
            memory_layout: RwLock::new(MemoryLayout::RowMajor),
            total_elements: AtomicU64::new(0),
            looping: AtomicBool::new(false),
            loop_region: RwLock::new(None),
            current_position: RwLock::new(Vec::new()),
            output_shape: RwLock::new(Vec::new()),
            configured_shape: None,
            auto_advance,
            processing: AtomicBool::new(false),
        }
    }

    /// Overrides the per-dimension window pulled on each cycle instead
    /// of the default (size 1 everywhere except CHANNEL).
    pub fn with_output_shape(mut self, shape: Vec<u64>) -> Self {
        self.configured_shape = Some(shape);
        self
    }

    pub fn current_position(&self) -> Vec<u64> {
        self.current_position.read().clone()
    }

    pub fn output_shape(&self) -> Vec<u64> {
        self.output_shape.read().clone()
    }

    fn default_output_shape(dims: &[DataDimension]) -> Vec<u64> {
        dims.iter()
            .map(|d| if d.role == DimensionRole::Channel { d.size } else { 1 })
            .collect()
    }

    fn advance(&self, container: &Arc<dyn SignalSourceContainer>) {
        let dims = self.dimensions.read();
        let shape = self.output_shape.read();
        let mut position = self.current_position.write();
        let primary = convention::TIME_DIM.min(position.len().saturating_sub(1));
        let dim_size = dims.get(primary).map(|d| d.size).unwrap_or(1);
        let step = shape.get(primary).copied().unwrap_or(1);
        let looping = self.looping.load(Ordering::Acquire);
        let (loop_start, loop_end) = match self.loop_region.read().as_ref() {
            Some(r) => (r.start_coordinates[primary], r.end_coordinates[primary] + 1),
            None => (0, dim_size),
        };
        position[primary] = coord::advance_position(position[primary], step, dim_size, loop_start, loop_end, looping);
        let new_primary = position[primary];
        drop(position);
        if let Some(stream) = container.as_stream_container() {
            stream.set_read_position(new_primary);
        }
    }
}

impl DataProcessor for ContiguousAccessProcessor {
    fn on_attach(&self, container: Arc<dyn SignalSourceContainer>) {
        let dims = container.dimensions();
        if dims.is_empty() || dims.iter().any(|d| d.size == 0) {
            log::error!("ContiguousAccessProcessor: container has no usable dimensions, attach aborted");
            return;
        }
        let shape = self.configured_shape.clone().unwrap_or_else(|| Self::default_output_shape(&dims));
        if shape.len() != dims.len() || shape.iter().zip(dims.iter()).any(|(s, d)| *s > d.size) {
            log::error!("ContiguousAccessProcessor: output shape doesn't match the container's dimensions, attach aborted");
            return;
        }

        *self.current_position.write() = vec![0; dims.len()];
        *self.output_shape.write() = shape;
        *self.memory_layout.write() = container.memory_layout();
        self.total_elements.store(container.total_elements(), Ordering::Release);
        if let Some(stream) = container.as_stream_container() {
            self.looping.store(stream.is_looping(), Ordering::Release);
            *self.loop_region.write() = stream.get_loop_region();
        }
        *self.dimensions.write() = dims;
    }

    fn on_detach(&self, _container: Arc<dyn SignalSourceContainer>) {
        self.current_position.write().clear();
        self.output_shape.write().clear();
        self.dimensions.write().clear();
    }

    fn process(&self, container: Arc<dyn SignalSourceContainer>) {
        if !container.begin_processing_cycle() {
            return;
        }
        self.processing.store(true, Ordering::Release);

        let start = self.current_position.read().clone();
        let shape = self.output_shape.read().clone();
        let dims = self.dimensions.read().clone();
        let end: Vec<u64> = start
            .iter()
            .zip(&shape)
            .zip(&dims)
            .map(|((s, sh), d)| (s + sh.saturating_sub(1)).min(d.size.saturating_sub(1)))
            .collect();

        match container.get_region_data(&Region::new(start, end)) {
            Ok(data) => {
                container.set_processed_data(data);
                if self.auto_advance {
                    self.advance(&container);
                }
                let _ = container.update_processing_state(ProcessingState::Processed);
            }
            Err(err) => {
                log::error!("ContiguousAccessProcessor: {err}");
                let _ = container.update_processing_state(ProcessingState::Error);
            }
        }
        self.processing.store(false, Ordering::Release);
    }

    fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::audio::AudioStreamContainer;
    use crate::container::StreamContainer;
    use crate::structure::Organization;
    use crate::variant::DataVariant;

    /// TIME=10, CHANNEL=2 interleaved, channel 0 = [0..9], channel 1 =
    /// [100..109], flattened row-major as the structure descriptor
    /// dictates (time-major, channel fastest).
    fn two_channel_container() -> Arc<dyn SignalSourceContainer> {
        let mut interleaved = Vec::with_capacity(20);
        for t in 0..10u64 {
            interleaved.push(t as f64);
            interleaved.push(100.0 + t as f64);
        }
        let data = vec![DataVariant::F64(interleaved)];
        Arc::new(AudioStreamContainer::new(Organization::Interleaved, 10, 2, data, 48_000.0).unwrap())
    }

    #[test]
    fn three_cycles_advance_read_position_to_end() {
        let container = two_channel_container();
        let processor = ContiguousAccessProcessor::new(true).with_output_shape(vec![3, 2]);
        processor.on_attach(container.clone());
        assert_eq!(processor.output_shape(), vec![3, 2]);

        for _ in 0..3 {
            processor.process(container.clone());
        }

        let stream = container.as_stream_container().unwrap();
        assert_eq!(stream.get_read_position(), 9);
        let processed = container.get_processed_data();
        assert_eq!(processed[0].as_f64_vec().len(), 6);
    }

    #[test]
    fn attach_rejects_zero_sized_dimension() {
        let data = vec![DataVariant::F64(Vec::new())];
        let container: Arc<dyn SignalSourceContainer> =
            Arc::new(AudioStreamContainer::new(Organization::Interleaved, 0, 1, data, 48_000.0).unwrap());
        let processor = ContiguousAccessProcessor::new(true);
        processor.on_attach(container.clone());
        assert!(processor.output_shape().is_empty());
    }
}
