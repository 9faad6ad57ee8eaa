use super::core::ContainerCore;
use super::stream::{StreamContainer, StreamCore};
use super::SignalSourceContainer;
use crate::error::KakshyaResult;
use crate::structure::StructureDescriptor;
use crate::variant::DataVariant;

/// Concrete container for VIDEO_COLOR: `[TIME, Y, X, CHANNEL=4]`
/// interleaved RGBA bytes, with a single frame cursor in place of a
/// per-dimension read position.
pub struct VideoStreamContainer {
    core: ContainerCore,
    stream: StreamCore,
    height: u64,
    width: u64,
}

impl VideoStreamContainer {
    pub fn new(num_frames: u64, height: u64, width: u64, raw_rgba: Vec<u8>, frame_rate: f64) -> KakshyaResult<Self> {
        let structure = StructureDescriptor::video_color(num_frames, height, width)?;
        let expected_len = structure.total_elements() as usize;
        if raw_rgba.len() != expected_len {
            return Err(crate::error::KakshyaError::Range(format!(
                "expected {expected_len} RGBA bytes, got {}",
                raw_rgba.len()
            )));
        }
        Ok(Self {
            core: ContainerCore::new(structure, vec![DataVariant::U8(raw_rgba)]),
            stream: StreamCore::new(frame_rate),
            height,
            width,
        })
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn width(&self) -> u64 {
        self.width
    }

    pub fn current_frame(&self) -> u64 {
        self.get_read_position()
    }

    pub fn set_current_frame(&self, frame: u64) {
        self.set_read_position(frame);
    }
}

impl SignalSourceContainer for VideoStreamContainer {
    fn core(&self) -> &ContainerCore {
        &self.core
    }

    fn as_stream_container(&self) -> Option<&dyn StreamContainer> {
        Some(self)
    }
}

impl StreamContainer for VideoStreamContainer {
    fn stream_core(&self) -> &StreamCore {
        &self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_frame_cursor_is_scalar() {
        let c = VideoStreamContainer::new(5, 2, 2, vec![0u8; 5 * 2 * 2 * 4], 30.0).unwrap();
        assert_eq!(c.current_frame(), 0);
        c.set_current_frame(3);
        assert_eq!(c.current_frame(), 3);
    }
}
