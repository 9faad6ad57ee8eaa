use super::core::ContainerCore;
use super::stream::{StreamContainer, StreamCore};
use super::SignalSourceContainer;
use crate::error::KakshyaResult;
use crate::structure::{Organization, StructureDescriptor};
use crate::variant::DataVariant;

/// Concrete container for planar/interleaved multichannel audio,
/// composing the shared data/region/state core with a stream read head.
pub struct AudioStreamContainer {
    core: ContainerCore,
    stream: StreamCore,
}

impl AudioStreamContainer {
    pub fn new(
        organization: Organization,
        num_frames: u64,
        num_channels: u64,
        raw_data: Vec<DataVariant>,
        sample_rate: f64,
    ) -> KakshyaResult<Self> {
        let structure = StructureDescriptor::audio_multichannel(organization, num_frames, num_channels)?;
        Ok(Self { core: ContainerCore::new(structure, raw_data), stream: StreamCore::new(sample_rate) })
    }
}

impl SignalSourceContainer for AudioStreamContainer {
    fn core(&self) -> &ContainerCore {
        &self.core
    }

    fn as_stream_container(&self) -> Option<&dyn StreamContainer> {
        Some(self)
    }
}

impl StreamContainer for AudioStreamContainer {
    fn stream_core(&self) -> &StreamCore {
        &self.stream
    }
}
