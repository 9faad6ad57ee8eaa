use super::attributes::{AttributeMap, AttributeValue};
use crate::structure::convention;

/// A rectangular coordinate span in N-D, not a buffer. `end_coordinates`
/// is inclusive throughout this crate.
///
/// Hashing and equality are over the coordinates only: two regions
/// spanning the same span are the same cache key regardless of label or
/// attributes, so a relabeled region still hits an existing cache entry.
#[derive(Debug, Clone)]
pub struct Region {
    pub start_coordinates: Vec<u64>,
    pub end_coordinates: Vec<u64>,
    pub label: Option<String>,
    pub attributes: AttributeMap,
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.start_coordinates == other.start_coordinates && self.end_coordinates == other.end_coordinates
    }
}

impl Eq for Region {}

impl std::hash::Hash for Region {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.start_coordinates.hash(state);
        self.end_coordinates.hash(state);
    }
}

impl Region {
    pub fn new(start: Vec<u64>, end_inclusive: Vec<u64>) -> Self {
        debug_assert_eq!(start.len(), end_inclusive.len());
        Self {
            start_coordinates: start,
            end_coordinates: end_inclusive,
            label: None,
            attributes: AttributeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        set_attribute(&mut self.attributes, key, value);
    }

    pub fn get_attribute(&self, key: &str) -> Option<&AttributeValue> {
        get_attribute(&self.attributes, key)
    }

    pub fn time_point(frame: u64, channels: u64) -> Self {
        Self::new(vec![frame, 0], vec![frame, channels.saturating_sub(1)])
    }

    pub fn time_span(start_frame: u64, end_frame_inclusive: u64, channels: u64) -> Self {
        Self::new(
            vec![start_frame, 0],
            vec![end_frame_inclusive, channels.saturating_sub(1)],
        )
    }

    pub fn image_rect(top: u64, left: u64, height: u64, width: u64) -> Self {
        Self::new(vec![top, left], vec![top + height - 1, left + width - 1])
    }

    pub fn video_region(start_frame: u64, end_frame_inclusive: u64, top: u64, left: u64, height: u64, width: u64) -> Self {
        Self::new(
            vec![start_frame, top, left, 0],
            vec![end_frame_inclusive, top + height - 1, left + width - 1, 3],
        )
    }

    pub fn is_point(&self) -> bool {
        self.start_coordinates == self.end_coordinates
    }

    pub fn contains(&self, coords: &[u64]) -> bool {
        if coords.len() != self.start_coordinates.len() {
            return false;
        }
        coords
            .iter()
            .zip(&self.start_coordinates)
            .zip(&self.end_coordinates)
            .all(|((c, s), e)| c >= s && c <= e)
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        if self.start_coordinates.len() != other.start_coordinates.len() {
            return false;
        }
        (0..self.start_coordinates.len()).all(|i| {
            self.start_coordinates[i] <= other.end_coordinates[i]
                && other.start_coordinates[i] <= self.end_coordinates[i]
        })
    }

    pub fn get_span(&self, dim: usize) -> u64 {
        self.end_coordinates[dim] - self.start_coordinates[dim] + 1
    }

    pub fn get_volume(&self) -> u64 {
        (0..self.start_coordinates.len()).map(|i| self.get_span(i)).product()
    }

    pub fn get_duration(&self) -> u64 {
        self.get_span(convention::TIME_DIM)
    }

    pub fn translate(&self, offset: &[i64]) -> Region {
        let shift = |coord: u64, delta: i64| -> u64 {
            if delta >= 0 {
                coord + delta as u64
            } else {
                coord.saturating_sub((-delta) as u64)
            }
        };
        let start = self
            .start_coordinates
            .iter()
            .zip(offset)
            .map(|(c, o)| shift(*c, *o))
            .collect();
        let end = self
            .end_coordinates
            .iter()
            .zip(offset)
            .map(|(c, o)| shift(*c, *o))
            .collect();
        Region::new(start, end)
    }

    pub fn scale(&self, factors: &[f64]) -> Region {
        let mut start = Vec::with_capacity(self.start_coordinates.len());
        let mut end = Vec::with_capacity(self.end_coordinates.len());
        for i in 0..self.start_coordinates.len() {
            let center = (self.start_coordinates[i] + self.end_coordinates[i]) as f64 / 2.0;
            let half_span = self.get_span(i) as f64 / 2.0 * factors[i];
            start.push((center - half_span).max(0.0).round() as u64);
            end.push((center + half_span).max(0.0).round() as u64);
        }
        Region::new(start, end)
    }
}

/// Cached copy of a region's data plus access bookkeeping for LRU
/// eviction.
#[derive(Debug, Clone)]
pub struct RegionCache {
    pub data: Vec<crate::variant::DataVariant>,
    pub source_region: Region,
    pub load_time: std::time::Instant,
    pub access_count: u64,
    pub is_dirty: bool,
}

impl RegionCache {
    pub fn new(data: Vec<crate::variant::DataVariant>, source_region: Region) -> Self {
        Self { data, source_region, load_time: std::time::Instant::now(), access_count: 0, is_dirty: false }
    }

    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn age(&self) -> std::time::Duration {
        self.load_time.elapsed()
    }
}

pub fn get_attribute<'a>(attributes: &'a AttributeMap, key: &str) -> Option<&'a AttributeValue> {
    attributes.get(key)
}

pub fn set_attribute(attributes: &mut AttributeMap, key: impl Into<String>, value: impl Into<AttributeValue>) {
    attributes.insert(key.into(), value.into());
}
