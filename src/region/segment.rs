use super::region::{Region, RegionCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Idle,
    Loading,
    Ready,
    Active,
    Transitioning,
    Unloading,
}

/// Sub-view of a `Region` with its own cursor and cache.
#[derive(Debug, Clone)]
pub struct RegionSegment {
    pub source_region: Region,
    pub offset_in_region: Vec<u64>,
    pub segment_size: Vec<u64>,
    pub current_position: Vec<u64>,
    pub cache: Option<RegionCache>,
    pub state: SegmentState,
}

impl RegionSegment {
    pub fn new(source_region: Region) -> Self {
        let dims = source_region.start_coordinates.len();
        let segment_size: Vec<u64> = (0..dims).map(|i| source_region.get_span(i)).collect();
        Self {
            current_position: source_region.start_coordinates.clone(),
            offset_in_region: vec![0; dims],
            segment_size,
            source_region,
            cache: None,
            state: SegmentState::Idle,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn start_coordinates(&self) -> &[u64] {
        &self.source_region.start_coordinates
    }

    pub fn end_coordinates(&self) -> &[u64] {
        &self.source_region.end_coordinates
    }

    pub fn contains_position(&self, position: &[u64]) -> bool {
        self.source_region.contains(position)
    }

    pub fn get_total_elements(&self) -> u64 {
        self.source_region.get_volume()
    }

    /// Increments the cursor along `dimension`, ripple-carrying into
    /// higher dimensions on overflow. Returns `false` once the last
    /// dimension has rolled past the segment's end (segment exhausted).
    pub fn advance_position(&mut self, steps: u64, dimension: usize) -> bool {
        if dimension >= self.current_position.len() {
            return false;
        }
        let mut remaining = steps;
        let mut dim = dimension;
        loop {
            let end = self.source_region.end_coordinates[dim];
            let start = self.source_region.start_coordinates[dim];
            let room = end.saturating_sub(self.current_position[dim]);
            if remaining <= room {
                self.current_position[dim] += remaining;
                return true;
            }
            remaining -= room + 1;
            self.current_position[dim] = start;
            if dim == 0 {
                return false;
            }
            dim -= 1;
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.current_position
            .iter()
            .zip(&self.source_region.end_coordinates)
            .all(|(c, e)| c == e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_ripples_into_higher_dim() {
        let mut seg = RegionSegment::new(Region::new(vec![0, 0], vec![1, 1]));
        assert!(seg.advance_position(1, 1));
        assert_eq!(seg.current_position, vec![0, 1]);
        assert!(seg.advance_position(1, 1));
        assert_eq!(seg.current_position, vec![1, 0]);
        assert!(!seg.is_at_end());
        assert!(seg.advance_position(1, 1));
        assert!(seg.is_at_end());
    }
}
