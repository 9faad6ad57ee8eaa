use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::state::{ProcessingState, StateChangeCallback};
use crate::error::{KakshyaError, KakshyaResult};
use crate::processing::chain::DataProcessingChain;
use crate::processing::processor::DataProcessor;
use crate::region::{Region, RegionGroup, RegionSegment};
use crate::structure::{convention, DimensionRole, Organization, StructureDescriptor};
use crate::variant::DataVariant;

/// Position of the `Channel`-role dimension, or `dimensions.len()` (an
/// out-of-range sentinel that excludes nothing) if the structure has
/// none — degenerate Planar then behaves like a single Interleaved plane.
fn channel_dim_index(dimensions: &[crate::structure::DataDimension]) -> usize {
    dimensions.iter().position(|d| d.role == DimensionRole::Channel).unwrap_or(dimensions.len())
}

fn strip_dim(coords: &[u64], dim: usize) -> Vec<u64> {
    coords.iter().enumerate().filter(|(i, _)| *i != dim).map(|(_, c)| *c).collect()
}

#[derive(Default)]
struct DimensionReaders {
    active: HashSet<u64>,
    next_id: u64,
}

/// Shared state every concrete container composes: structure, raw and
/// processed data, region groups, and lifecycle state, each behind its
/// own lock or atomic.
pub struct ContainerCore {
    pub structure: RwLock<StructureDescriptor>,
    pub raw_data: RwLock<Vec<DataVariant>>,
    pub processed_data: RwLock<Vec<DataVariant>>,
    region_groups: RwLock<HashMap<String, RegionGroup>>,
    processing_state: RwLock<ProcessingState>,
    state_callbacks: RwLock<Vec<(u64, StateChangeCallback)>>,
    next_callback_id: AtomicU64,
    ready_for_processing: AtomicBool,
    reader_tracking: RwLock<HashMap<usize, DimensionReaders>>,
    processing_token: AtomicI64,
    default_processor: RwLock<Option<Arc<dyn DataProcessor>>>,
    loaded_regions: RwLock<HashSet<Region>>,
    processing_chain: RwLock<Option<Arc<Mutex<DataProcessingChain>>>>,
    /// Advisory exclusive-access gate, orthogonal to the interior
    /// `RwLock`s guarding individual fields above: callers doing a
    /// multi-step read-modify-write across several of those fields take
    /// this first so no other caller's multi-step operation interleaves.
    exclusive: AtomicBool,
}

impl ContainerCore {
    pub fn new(structure: StructureDescriptor, raw_data: Vec<DataVariant>) -> Self {
        let processed_data = raw_data.clone();
        Self {
            structure: RwLock::new(structure),
            raw_data: RwLock::new(raw_data),
            processed_data: RwLock::new(processed_data),
            region_groups: RwLock::new(HashMap::new()),
            processing_state: RwLock::new(ProcessingState::Idle),
            state_callbacks: RwLock::new(Vec::new()),
            next_callback_id: AtomicU64::new(0),
            ready_for_processing: AtomicBool::new(false),
            reader_tracking: RwLock::new(HashMap::new()),
            processing_token: AtomicI64::new(-1),
            default_processor: RwLock::new(None),
            loaded_regions: RwLock::new(HashSet::new()),
            processing_chain: RwLock::new(None),
            exclusive: AtomicBool::new(false),
        }
    }

    /// Blocks until the exclusive-access gate is free, then takes it.
    pub fn lock(&self) {
        while self
            .exclusive
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    /// Takes the exclusive-access gate without blocking. Returns `false`
    /// if another caller already holds it.
    pub fn try_lock(&self) -> bool {
        self.exclusive
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn unlock(&self) {
        self.exclusive.store(false, Ordering::Release);
    }

    pub fn get_default_processor(&self) -> Option<Arc<dyn DataProcessor>> {
        self.default_processor.read().clone()
    }

    pub fn set_default_processor(&self, processor: Option<Arc<dyn DataProcessor>>) {
        *self.default_processor.write() = processor;
    }

    pub fn has_data(&self) -> bool {
        self.raw_data.read().iter().any(|v| !v.is_empty())
    }

    pub fn clear(&self) {
        self.raw_data.write().iter_mut().for_each(|v| *v = crate::variant::DataVariant::F64(Vec::new()));
        self.processed_data.write().clear();
    }

    pub fn get_processing_state(&self) -> ProcessingState {
        *self.processing_state.read()
    }

    pub fn update_processing_state(&self, new_state: ProcessingState) -> KakshyaResult<()> {
        let mut state = self.processing_state.write();
        if !state.can_transition_to(new_state) {
            return Err(KakshyaError::State(format!(
                "illegal transition {:?} -> {:?}",
                *state, new_state
            )));
        }
        let old = *state;
        *state = new_state;
        drop(state);
        for (_, cb) in self.state_callbacks.read().iter() {
            cb(old, new_state);
        }
        Ok(())
    }

    pub fn register_state_change_callback(&self, callback: StateChangeCallback) -> u64 {
        let id = self.next_callback_id.fetch_add(1, Ordering::Relaxed);
        self.state_callbacks.write().push((id, callback));
        id
    }

    pub fn unregister_state_change_callback(&self, id: u64) {
        self.state_callbacks.write().retain(|(cb_id, _)| *cb_id != id);
    }

    pub fn is_ready_for_processing(&self) -> bool {
        self.ready_for_processing.load(Ordering::Acquire)
    }

    pub fn mark_ready_for_processing(&self, ready: bool) {
        self.ready_for_processing.store(ready, Ordering::Release);
    }

    pub fn add_region_group(&self, group: RegionGroup) {
        self.region_groups.write().insert(group.name.clone(), group);
    }

    pub fn get_region_group(&self, name: &str) -> Option<RegionGroup> {
        self.region_groups.read().get(name).cloned()
    }

    pub fn get_all_region_groups(&self) -> Vec<RegionGroup> {
        self.region_groups.read().values().cloned().collect()
    }

    pub fn remove_region_group(&self, name: &str) {
        self.region_groups.write().remove(name);
    }

    /// Data for every region in `group_name`, in the group's region order.
    pub fn get_region_group_data(&self, group_name: &str) -> KakshyaResult<Vec<Vec<DataVariant>>> {
        let group = self
            .get_region_group(group_name)
            .ok_or_else(|| KakshyaError::Range(format!("no such region group: {group_name}")))?;
        group.regions.iter().map(|r| self.get_region_data(r)).collect()
    }

    /// Data for each segment's source region, in input order.
    pub fn get_segments_data(&self, segments: &[RegionSegment]) -> KakshyaResult<Vec<Vec<DataVariant>>> {
        segments.iter().map(|s| self.get_region_data(&s.source_region)).collect()
    }

    pub fn is_region_loaded(&self, region: &Region) -> bool {
        self.loaded_regions.read().contains(region)
    }

    /// Reads `region`'s data and marks it loaded, so a later
    /// `is_region_loaded` check reflects residency without re-reading.
    pub fn load_region(&self, region: &Region) -> KakshyaResult<Vec<DataVariant>> {
        let data = self.get_region_data(region)?;
        self.loaded_regions.write().insert(region.clone());
        Ok(data)
    }

    pub fn unload_region(&self, region: &Region) {
        self.loaded_regions.write().remove(region);
    }

    pub fn get_processing_chain(&self) -> Option<Arc<Mutex<DataProcessingChain>>> {
        self.processing_chain.read().clone()
    }

    pub fn set_processing_chain(&self, chain: Option<Arc<Mutex<DataProcessingChain>>>) {
        *self.processing_chain.write() = chain;
    }

    /// A single time-slice across every other dimension.
    pub fn get_frame(&self, frame: u64) -> KakshyaResult<Vec<DataVariant>> {
        self.get_frames(frame, 1)
    }

    /// `count` consecutive time-slices across every other dimension.
    pub fn get_frames(&self, start_frame: u64, count: u64) -> KakshyaResult<Vec<DataVariant>> {
        let dims = self.structure.read().dimensions.clone();
        if dims.is_empty() {
            return Ok(Vec::new());
        }
        let mut start = vec![0u64; dims.len()];
        let mut end: Vec<u64> = dims.iter().map(|d| d.size.saturating_sub(1)).collect();
        start[convention::TIME_DIM] = start_frame;
        end[convention::TIME_DIM] = start_frame + count.saturating_sub(1);
        self.get_region_data(&Region::new(start, end))
    }

    pub fn get_value_at(&self, coordinates: &[u64]) -> KakshyaResult<Vec<DataVariant>> {
        self.get_region_data(&Region::new(coordinates.to_vec(), coordinates.to_vec()))
    }

    pub fn set_value_at(&self, coordinates: &[u64], data: &[DataVariant]) -> KakshyaResult<()> {
        self.set_region_data(&Region::new(coordinates.to_vec(), coordinates.to_vec()), data)
    }

    pub fn register_dimension_reader(&self, dim: usize) -> u64 {
        let mut tracking = self.reader_tracking.write();
        let entry = tracking.entry(dim).or_default();
        let id = entry.next_id;
        entry.next_id += 1;
        entry.active.insert(id);
        id
    }

    pub fn unregister_dimension_reader(&self, dim: usize, reader_id: u64) {
        if let Some(entry) = self.reader_tracking.write().get_mut(&dim) {
            entry.active.remove(&reader_id);
        }
    }

    pub fn has_active_readers(&self, dim: usize) -> bool {
        self.reader_tracking
            .read()
            .get(&dim)
            .map(|e| !e.active.is_empty())
            .unwrap_or(false)
    }

    pub fn mark_dimension_consumed(&self, dim: usize, reader_id: u64) {
        self.unregister_dimension_reader(dim, reader_id);
    }

    pub fn all_dimensions_consumed(&self) -> bool {
        self.reader_tracking.read().values().all(|e| e.active.is_empty())
    }

    pub fn reset_processing_token(&self) {
        self.processing_token.store(-1, Ordering::Release);
    }

    pub fn try_acquire_processing_token(&self, channel: i64) -> bool {
        self.processing_token
            .compare_exchange(-1, channel, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn has_processing_token(&self, channel: i64) -> bool {
        self.processing_token.load(Ordering::Acquire) == channel
    }

    /// Reads `region`'s data, preserving each source variant's scalar
    /// type. Interleaved containers hold one buffer spanning every
    /// dimension including `Channel`; Planar containers hold one buffer
    /// per channel, each addressed over the non-channel dimensions only,
    /// so only the channels `region` actually spans are read.
    pub fn get_region_data(&self, region: &Region) -> KakshyaResult<Vec<DataVariant>> {
        let structure = self.structure.read();
        let raw = self.raw_data.read();
        match structure.organization {
            Organization::Interleaved => {
                let mut out = Vec::with_capacity(raw.len());
                for variant in raw.iter() {
                    let values = variant.as_f64_vec();
                    let extracted = crate::coord::extract_region_f64(
                        &values,
                        &region.start_coordinates,
                        &region.end_coordinates,
                        &structure.dimensions,
                        structure.memory_layout,
                    );
                    out.push(variant.like_with_values(extracted));
                }
                Ok(out)
            }
            Organization::Planar => {
                let channel_dim = channel_dim_index(&structure.dimensions);
                let non_channel: Vec<_> = structure
                    .dimensions
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != channel_dim)
                    .map(|(_, d)| d.clone())
                    .collect();
                let start_nc = strip_dim(&region.start_coordinates, channel_dim);
                let end_nc = strip_dim(&region.end_coordinates, channel_dim);
                let start_channel = region.start_coordinates.get(channel_dim).copied().unwrap_or(0);
                let end_channel = region.end_coordinates.get(channel_dim).copied().unwrap_or(0);

                let mut out = Vec::with_capacity((end_channel - start_channel + 1) as usize);
                for channel in start_channel..=end_channel {
                    let variant = raw.get(channel as usize).ok_or_else(|| {
                        KakshyaError::Range(format!("planar channel {channel} has no backing buffer"))
                    })?;
                    let values = variant.as_f64_vec();
                    let extracted = crate::coord::extract_region_f64(
                        &values,
                        &start_nc,
                        &end_nc,
                        &non_channel,
                        structure.memory_layout,
                    );
                    out.push(variant.like_with_values(extracted));
                }
                Ok(out)
            }
        }
    }

    /// Writes `data` into `region`, mirroring `get_region_data`'s
    /// Interleaved/Planar split. For Planar, `data` must carry exactly
    /// one entry per channel the region spans, in channel order.
    pub fn set_region_data(&self, region: &Region, data: &[DataVariant]) -> KakshyaResult<()> {
        let structure = self.structure.read();
        let mut raw = self.raw_data.write();
        match structure.organization {
            Organization::Interleaved => {
                if data.len() != raw.len() {
                    return Err(KakshyaError::Range(format!(
                        "expected {} variants, got {}",
                        raw.len(),
                        data.len()
                    )));
                }
                for (dest, src) in raw.iter_mut().zip(data) {
                    let mut dest_values = dest.as_f64_vec();
                    let source_values = src.as_f64_vec();
                    crate::coord::set_region_f64(
                        &mut dest_values,
                        &source_values,
                        &region.start_coordinates,
                        &region.end_coordinates,
                        &structure.dimensions,
                        structure.memory_layout,
                    );
                    dest.write_from_f64(&dest_values);
                }
                Ok(())
            }
            Organization::Planar => {
                let channel_dim = channel_dim_index(&structure.dimensions);
                let non_channel: Vec<_> = structure
                    .dimensions
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != channel_dim)
                    .map(|(_, d)| d.clone())
                    .collect();
                let start_nc = strip_dim(&region.start_coordinates, channel_dim);
                let end_nc = strip_dim(&region.end_coordinates, channel_dim);
                let start_channel = region.start_coordinates.get(channel_dim).copied().unwrap_or(0);
                let end_channel = region.end_coordinates.get(channel_dim).copied().unwrap_or(0);
                let expected = (end_channel - start_channel + 1) as usize;
                if data.len() != expected {
                    return Err(KakshyaError::Range(format!(
                        "expected {expected} planar variants, got {}",
                        data.len()
                    )));
                }
                for (offset, src) in data.iter().enumerate() {
                    let channel = start_channel + offset as u64;
                    let dest = raw.get_mut(channel as usize).ok_or_else(|| {
                        KakshyaError::Range(format!("planar channel {channel} has no backing buffer"))
                    })?;
                    let mut dest_values = dest.as_f64_vec();
                    let source_values = src.as_f64_vec();
                    crate::coord::set_region_f64(
                        &mut dest_values,
                        &source_values,
                        &start_nc,
                        &end_nc,
                        &non_channel,
                        structure.memory_layout,
                    );
                    dest.write_from_f64(&dest_values);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{Organization, StructureDescriptor};

    fn core() -> ContainerCore {
        let structure = StructureDescriptor::audio_multichannel(Organization::Interleaved, 10, 1).unwrap();
        ContainerCore::new(structure, vec![DataVariant::F64((0..10).map(|x| x as f64).collect())])
    }

    #[test]
    fn round_trip_region_data_is_noop() {
        let c = core();
        let region = Region::new(vec![2, 0], vec![5, 0]);
        let data = c.get_region_data(&region).unwrap();
        c.set_region_data(&region, &data).unwrap();
        let after = c.get_region_data(&region).unwrap();
        assert_eq!(data, after);
    }

    #[test]
    fn get_region_data_preserves_non_f64_variant_type() {
        let structure = StructureDescriptor::audio_multichannel(Organization::Interleaved, 4, 1).unwrap();
        let c = ContainerCore::new(structure, vec![DataVariant::U16(vec![10, 20, 30, 40])]);
        let region = Region::new(vec![1, 0], vec![2, 0]);
        let data = c.get_region_data(&region).unwrap();
        assert_eq!(data, vec![DataVariant::U16(vec![20, 30])]);
    }

    #[test]
    fn planar_region_data_addresses_only_the_spanned_channels() {
        let structure = StructureDescriptor::audio_multichannel(Organization::Planar, 4, 2).unwrap();
        let c = ContainerCore::new(
            structure,
            vec![
                DataVariant::F64(vec![0.0, 1.0, 2.0, 3.0]),
                DataVariant::F64(vec![100.0, 101.0, 102.0, 103.0]),
            ],
        );
        let channel_0_only = Region::new(vec![1, 0], vec![2, 0]);
        let data = c.get_region_data(&channel_0_only).unwrap();
        assert_eq!(data, vec![DataVariant::F64(vec![1.0, 2.0])]);

        let both_channels = Region::new(vec![1, 0], vec![2, 1]);
        let data = c.get_region_data(&both_channels).unwrap();
        assert_eq!(data, vec![DataVariant::F64(vec![1.0, 2.0]), DataVariant::F64(vec![101.0, 102.0])]);
    }

    #[test]
    fn planar_round_trip_writes_back_into_the_right_channel_buffer() {
        let structure = StructureDescriptor::audio_multichannel(Organization::Planar, 4, 2).unwrap();
        let c = ContainerCore::new(
            structure,
            vec![DataVariant::F64(vec![0.0; 4]), DataVariant::F64(vec![0.0; 4])],
        );
        let region = Region::new(vec![0, 1], vec![3, 1]);
        c.set_region_data(&region, &[DataVariant::F64(vec![9.0, 9.0, 9.0, 9.0])]).unwrap();
        assert_eq!(c.raw_data.read()[0], DataVariant::F64(vec![0.0; 4]));
        assert_eq!(c.raw_data.read()[1], DataVariant::F64(vec![9.0; 4]));
    }

    #[test]
    fn exclusive_lock_gates_a_second_caller() {
        let c = core();
        assert!(c.try_lock());
        assert!(!c.try_lock());
        c.unlock();
        assert!(c.try_lock());
    }

    #[test]
    fn frame_and_value_accessors() {
        let c = core();
        let frame = c.get_frame(3).unwrap();
        assert_eq!(frame[0].as_f64_vec(), vec![3.0]);
        let frames = c.get_frames(2, 3).unwrap();
        assert_eq!(frames[0].as_f64_vec(), vec![2.0, 3.0, 4.0]);
        let value = c.get_value_at(&[5, 0]).unwrap();
        assert_eq!(value[0].as_f64_vec(), vec![5.0]);
        c.set_value_at(&[5, 0], &[DataVariant::F64(vec![99.0])]).unwrap();
        assert_eq!(c.get_value_at(&[5, 0]).unwrap()[0].as_f64_vec(), vec![99.0]);
    }

    #[test]
    fn region_loading_tracks_residency() {
        let c = core();
        let region = Region::new(vec![0, 0], vec![1, 0]);
        assert!(!c.is_region_loaded(&region));
        c.load_region(&region).unwrap();
        assert!(c.is_region_loaded(&region));
        c.unload_region(&region);
        assert!(!c.is_region_loaded(&region));
    }

    #[test]
    fn processing_chain_handle_round_trips() {
        let c = core();
        assert!(c.get_processing_chain().is_none());
        let chain = Arc::new(Mutex::new(DataProcessingChain::new()));
        c.set_processing_chain(Some(chain.clone()));
        assert!(c.get_processing_chain().is_some());
    }

    #[test]
    fn state_discipline_rejects_illegal_jump() {
        let c = core();
        assert!(c.update_processing_state(ProcessingState::Processed).is_err());
        c.update_processing_state(ProcessingState::Ready).unwrap();
        c.update_processing_state(ProcessingState::Processing).unwrap();
        c.update_processing_state(ProcessingState::Processed).unwrap();
    }

    #[test]
    fn processing_token_is_exclusive() {
        let c = core();
        assert!(c.try_acquire_processing_token(1));
        assert!(!c.try_acquire_processing_token(2));
        c.reset_processing_token();
        assert!(c.try_acquire_processing_token(2));
    }

    #[test]
    fn reader_tracking_gates_consumption() {
        let c = core();
        let id = c.register_dimension_reader(0);
        assert!(c.has_active_readers(0));
        assert!(!c.all_dimensions_consumed());
        c.mark_dimension_consumed(0, id);
        assert!(c.all_dimensions_consumed());
    }
}
