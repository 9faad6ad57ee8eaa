use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::container::{ProcessingState, SignalSourceContainer};
use crate::processing::DataProcessor;
use crate::region::{RegionGroupCallback, SelectionPattern, TransitionKind};

use super::region_base::RegionProcessorBase;

/// Non-linear region orchestrator: selects a segment inside the active
/// region per its configured `SelectionPattern`, advances through it,
/// and blends across the boundary into the next region when a
/// transition is configured.
pub struct RegionOrganizationProcessor {
    base: RegionProcessorBase,
    rng: Mutex<ChaCha8Rng>,
    weights: RwLock<HashMap<usize, Vec<f64>>>,
    on_transition: Option<RegionGroupCallback>,
}

impl RegionOrganizationProcessor {
    pub fn new(cache_capacity: usize, seed: u64) -> Self {
        Self {
            base: RegionProcessorBase::new(cache_capacity),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            weights: RwLock::new(HashMap::new()),
            on_transition: None,
        }
    }

    pub fn with_transition_callback(mut self, callback: RegionGroupCallback) -> Self {
        self.on_transition = Some(callback);
        self
    }

    pub fn base(&self) -> &RegionProcessorBase {
        &self.base
    }

    /// Configures per-segment weights used by `SelectionPattern::Weighted`
    /// for the organized region at `region_index`.
    pub fn set_region_weights(&self, region_index: usize, weights: Vec<f64>) {
        self.weights.write().insert(region_index, weights);
    }

    /// Finds the organized region carrying `(group, index)` as its
    /// originating group name and region index, and makes it current.
    pub fn jump_to_region(&self, group: &str, index: usize) {
        let target = self
            .base
            .organized_regions
            .read()
            .iter()
            .position(|r| r.group_name == group && r.region_index == index);
        if let Some(target) = target {
            self.base.set_current_region_index(target);
        }
    }

    pub fn jump_to_position(&self, coords: &[u64]) {
        if let Some(index) = self.base.find_region_for_position(coords) {
            self.base.set_current_region_index(index);
            self.base.organized_regions.write()[index].current_position = coords.to_vec();
        }
    }

    fn select_next_segment(&self, region_index: usize, segment_count: usize, active: usize, pattern: SelectionPattern) -> usize {
        if segment_count == 0 {
            return 0;
        }
        match pattern {
            SelectionPattern::Sequential | SelectionPattern::RoundRobin => (active + 1) % segment_count,
            SelectionPattern::Random => self.rng.lock().gen_range(0..segment_count),
            SelectionPattern::Weighted => match self.weights.read().get(&region_index) {
                Some(weights) if weights.len() == segment_count => WeightedIndex::new(weights)
                    .map(|dist| dist.sample(&mut *self.rng.lock()))
                    .unwrap_or((active + 1) % segment_count),
                _ => (active + 1) % segment_count,
            },
            SelectionPattern::Overlap | SelectionPattern::Exclusive | SelectionPattern::Custom | SelectionPattern::All => active,
        }
    }

    fn blend(&self, current: &[f64], next: &[f64], kind: TransitionKind) -> Vec<f64> {
        let n = current.len().min(next.len());
        match kind {
            TransitionKind::Crossfade => (0..n)
                .map(|i| {
                    let f = i as f64 / n.max(1) as f64;
                    current[i] * (1.0 - f) + next[i] * f
                })
                .collect(),
            TransitionKind::Overlap => (0..n).map(|i| 0.5 * current[i] + 0.5 * next[i]).collect(),
            TransitionKind::Immediate | TransitionKind::Gated => next[..n].to_vec(),
            TransitionKind::Callback => {
                if let Some(callback) = &self.on_transition {
                    callback("region-transition", n);
                }
                next[..n].to_vec()
            }
        }
    }
}

impl DataProcessor for RegionOrganizationProcessor {
    fn on_attach(&self, container: Arc<dyn SignalSourceContainer>) {
        self.base.organize_from_groups(&container);
        self.base.set_current_region_index(0);
    }

    fn on_detach(&self, _container: Arc<dyn SignalSourceContainer>) {
        self.base.organized_regions.write().clear();
        self.base.set_current_region_index(0);
    }

    fn process(&self, container: Arc<dyn SignalSourceContainer>) {
        if !container.begin_processing_cycle() {
            return;
        }
        self.base.processing.store(true, Ordering::Release);

        let region_count = self.base.organized_regions.read().len();
        if region_count == 0 {
            let _ = container.update_processing_state(ProcessingState::Processed);
            self.base.processing.store(false, Ordering::Release);
            return;
        }
        let current_index = self.base.current_region_index().min(region_count - 1);

        let (segment, pattern, active, segment_count, is_last_segment, transition, transition_duration_ms) = {
            let regions = self.base.organized_regions.read();
            let region = &regions[current_index];
            let active = region.active_segment_index.min(region.segments.len().saturating_sub(1));
            (
                region.segments.get(active).cloned(),
                region.selection_pattern,
                active,
                region.segments.len(),
                active + 1 >= region.segments.len(),
                region.transition_type,
                region.transition_duration_ms,
            )
        };

        let Some(segment) = segment else {
            let _ = container.update_processing_state(ProcessingState::Processed);
            self.base.processing.store(false, Ordering::Release);
            return;
        };

        let segment_done = segment.current_position[0] >= segment.source_region.end_coordinates[0];
        let is_last_region = current_index + 1 >= region_count;

        let cache_hit = self.base.cache_manager.get_cached_segment(&segment);
        let extracted = match &cache_hit {
            Some(cache) => cache.data.clone(),
            None => container.get_region_data(&segment.source_region).unwrap_or_default(),
        };

        if cache_hit.is_none() && !extracted.is_empty() {
            self.base.cache_region_if_needed(&segment, extracted.clone());
        }

        let apply_transition = is_last_segment && segment_done && is_last_region
            && matches!(transition, TransitionKind::Crossfade | TransitionKind::Overlap)
            && transition_duration_ms > 0.0;

        let output = if apply_transition {
            let next_segment = self.base.organized_regions.read()[0].segments.first().cloned();
            match next_segment {
                Some(next_segment) => {
                    let next_data = container.get_region_data(&next_segment.source_region).unwrap_or_default();
                    if next_data.is_empty() {
                        log::warn!("RegionOrganizationProcessor: transition skipped, next region has no data");
                        extracted
                    } else {
                        extracted
                            .iter()
                            .zip(next_data.iter())
                            .map(|(cur, next)| {
                                let blended = self.blend(&cur.as_f64_vec(), &next.as_f64_vec(), transition);
                                let mut out = cur.clone();
                                out.write_from_f64(&blended);
                                out
                            })
                            .collect()
                    }
                }
                None => {
                    log::warn!("RegionOrganizationProcessor: transition skipped, no next region");
                    extracted
                }
            }
        } else {
            extracted
        };

        container.set_processed_data(output);

        {
            let mut regions = self.base.organized_regions.write();
            let region = &mut regions[current_index];
            if segment_done {
                let next = self.select_next_segment(current_index, segment_count, active, pattern);
                region.active_segment_index = next;
                if let Some(seg) = region.segments.get_mut(active) {
                    seg.current_position = seg.source_region.start_coordinates.clone();
                }
            } else if let Some(seg) = region.segments.get_mut(active) {
                seg.advance_position(1, 0);
            }
        }

        if is_last_segment && segment_done {
            self.base.set_current_region_index(if is_last_region { 0 } else { current_index + 1 });
        }

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
    use crate::structure::Organization;

    fn container_with_two_regions() -> Arc<dyn SignalSourceContainer> {
        let data = vec![DataVariant::F64((0..22).map(|x| x as f64).collect())];
        let container: Arc<dyn SignalSourceContainer> =
            Arc::new(AudioStreamContainer::new(Organization::Interleaved, 11, 2, data, 48_000.0).unwrap());
        let mut group = RegionGroup::new("g");
        group.transition_type = TransitionKind::Crossfade;
        group.add_region(Region::time_span(0, 9, 2));
        group.add_region(Region::time_span(10, 10, 2));
        container.add_region_group(group);
        container
    }

    #[test]
    fn sequential_selection_picks_the_only_segment_repeatedly() {
        let container = container_with_two_regions();
        let processor = RegionOrganizationProcessor::new(16, 7);
        processor.on_attach(container.clone());
        processor.process(container.clone());
        assert_eq!(container.get_processing_state(), ProcessingState::Processed);
        assert!(!container.get_processed_data().is_empty());
    }

    #[test]
    fn jump_to_region_moves_the_active_cursor() {
        let container = container_with_two_regions();
        let processor = RegionOrganizationProcessor::new(16, 7);
        processor.on_attach(container.clone());
        processor.jump_to_region("g", 1);
        assert_eq!(processor.base().current_region_index(), 1);
    }

    fn container_with_two_single_frame_regions(transition_ms: f64) -> Arc<dyn SignalSourceContainer> {
        // time0: ch0=100, ch1=100; time1: ch0=5, ch1=5
        let data = vec![DataVariant::F64(vec![100.0, 100.0, 5.0, 5.0])];
        let container: Arc<dyn SignalSourceContainer> =
            Arc::new(AudioStreamContainer::new(Organization::Interleaved, 2, 2, data, 48_000.0).unwrap());
        let mut group = RegionGroup::new("g");
        group.transition_type = TransitionKind::Crossfade;
        group.add_region(Region::time_span(0, 0, 2));
        group.add_region(Region::time_span(1, 1, 2));
        if transition_ms > 0.0 {
            group.set_region_transition(1, transition_ms);
        }
        container.add_region_group(group);
        container
    }

    #[test]
    fn boundary_crossing_is_a_hard_cut_without_a_configured_duration() {
        let container = container_with_two_single_frame_regions(0.0);
        let processor = RegionOrganizationProcessor::new(16, 7);
        processor.on_attach(container.clone());
        processor.process(container.clone()); // region 0
        processor.process(container.clone()); // region 1, last region, no transition configured
        assert_eq!(container.get_processed_data()[0].as_f64_vec(), vec![5.0, 5.0]);
    }

    #[test]
    fn boundary_crossing_blends_once_a_duration_is_configured() {
        let container = container_with_two_single_frame_regions(250.0);
        let processor = RegionOrganizationProcessor::new(16, 7);
        processor.on_attach(container.clone());
        processor.process(container.clone()); // region 0
        processor.process(container.clone()); // region 1, blends into region 0
        assert_eq!(container.get_processed_data()[0].as_f64_vec(), vec![5.0, 52.5]);
    }
}
