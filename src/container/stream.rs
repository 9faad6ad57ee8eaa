use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use super::SignalSourceContainer;
use crate::coord;
use crate::region::Region;
use crate::variant::DataVariant;

/// Read-head state shared by every stream container.
pub struct StreamCore {
    read_position: AtomicU64,
    looping: AtomicBool,
    loop_region: RwLock<Option<Region>>,
    temporal_rate: f64,
}

impl StreamCore {
    pub fn new(temporal_rate: f64) -> Self {
        Self {
            read_position: AtomicU64::new(0),
            looping: AtomicBool::new(false),
            loop_region: RwLock::new(None),
            temporal_rate,
        }
    }
}

/// Extends the container interface with a temporal read head: position,
/// looping, loop region, rate conversions, and sequential read/peek.
pub trait StreamContainer: SignalSourceContainer {
    fn stream_core(&self) -> &StreamCore;

    fn set_read_position(&self, position: u64) {
        self.stream_core().read_position.store(position, Ordering::Release);
    }

    fn get_read_position(&self) -> u64 {
        self.stream_core().read_position.load(Ordering::Acquire)
    }

    fn update_read_position_for_channel(&self, _channel: usize, frame: u64) {
        self.set_read_position(frame);
    }

    fn advance_read_position(&self, delta: u64) {
        let core = self.stream_core();
        let num_frames = self.num_frames();
        let (loop_start, loop_end) = {
            let region = core.loop_region.read();
            match region.as_ref() {
                Some(r) => (r.start_coordinates[0], r.end_coordinates[0] + 1),
                None => (0, num_frames),
            }
        };
        let advanced = coord::advance_position(
            self.get_read_position(),
            delta,
            num_frames,
            loop_start,
            loop_end,
            self.is_looping(),
        );
        self.set_read_position(advanced);
    }

    fn is_at_end(&self) -> bool {
        self.get_read_position() + 1 >= self.num_frames()
    }

    fn reset_read_position(&self) {
        self.set_read_position(0);
    }

    fn temporal_rate(&self) -> f64 {
        self.stream_core().temporal_rate
    }

    fn time_to_position(&self, time_secs: f64) -> u64 {
        (time_secs * self.temporal_rate()).floor() as u64
    }

    fn position_to_time(&self, position: u64) -> f64 {
        position as f64 / self.temporal_rate()
    }

    fn set_looping(&self, enabled: bool) {
        self.stream_core().looping.store(enabled, Ordering::Release);
    }

    fn is_looping(&self) -> bool {
        self.stream_core().looping.load(Ordering::Acquire)
    }

    fn set_loop_region(&self, region: Region) {
        *self.stream_core().loop_region.write() = Some(region);
    }

    fn get_loop_region(&self) -> Option<Region> {
        self.stream_core().loop_region.read().clone()
    }

    fn is_ready(&self) -> bool {
        self.is_ready_for_processing()
    }

    fn remaining_frames(&self) -> u64 {
        self.num_frames().saturating_sub(self.get_read_position())
    }

    /// Reads `n` frames starting from the current read position, then
    /// advances. Returns the number of frames actually consumed.
    fn read_sequential(&self, out: &mut Vec<DataVariant>, n: u64) -> u64 {
        let consumed = self.peek_sequential(out, n, 0);
        self.advance_read_position(consumed);
        consumed
    }

    /// Same as `read_sequential` but does not mutate the read position.
    fn peek_sequential(&self, out: &mut Vec<DataVariant>, n: u64, offset: u64) -> u64 {
        let start = self.get_read_position() + offset;
        let available = self.num_frames().saturating_sub(start);
        let consumed = n.min(available);
        if consumed == 0 {
            out.clear();
            return 0;
        }
        let channel_count = self.dimensions().iter().find(|d| {
            matches!(d.role, crate::structure::DimensionRole::Channel)
        }).map(|d| d.size).unwrap_or(1);
        let region = Region::time_span(start, start + consumed - 1, channel_count);
        *out = self.get_region_data(&region).unwrap_or_default();
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::audio::AudioStreamContainer;
    use crate::structure::Organization;

    #[test]
    fn sequential_read_matches_peek() {
        let data = vec![DataVariant::F64((0..10).map(|x| x as f64).collect())];
        let c = AudioStreamContainer::new(Organization::Interleaved, 10, 1, data, 48_000.0).unwrap();
        let mut peeked = Vec::new();
        let mut read = Vec::new();
        c.peek_sequential(&mut peeked, 4, 0);
        c.read_sequential(&mut read, 4);
        assert_eq!(peeked, read);
        assert_eq!(c.get_read_position(), 4);
    }

    #[test]
    fn looping_wraps_in_region() {
        let data = vec![DataVariant::F64((0..10).map(|x| x as f64).collect())];
        let c = AudioStreamContainer::new(Organization::Interleaved, 10, 1, data, 48_000.0).unwrap();
        c.set_looping(true);
        c.set_loop_region(Region::time_span(2, 6, 1));
        c.set_read_position(5);
        c.advance_read_position(4);
        let pos = c.get_read_position();
        assert!((2..=6).contains(&pos));
    }
}
