use serde::{Deserialize, Serialize};

use crate::error::{KakshyaError, KakshyaResult};

/// Semantic kind of the data a container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    Audio1D,
    AudioMultichannel,
    Image2D,
    ImageColor,
    VideoGrayscale,
    VideoColor,
    Spectral2D,
    Volumetric3D,
    TensorNd,
    Unknown,
}

/// Physical layout: one buffer with all channels mixed, or one buffer
/// per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Organization {
    Interleaved,
    Planar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryLayout {
    RowMajor,
    ColumnMajor,
}

/// Semantic role of a single dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimensionRole {
    Time,
    Channel,
    SpatialX,
    SpatialY,
    SpatialZ,
    Frequency,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDimension {
    pub name: String,
    pub size: u64,
    pub stride: u64,
    pub role: DimensionRole,
}

impl DataDimension {
    pub fn new(name: impl Into<String>, size: u64, stride: u64, role: DimensionRole) -> Self {
        Self { name: name.into(), size, stride, role }
    }

    pub fn time(size: u64) -> Self {
        Self::new("time", size, 1, DimensionRole::Time)
    }

    pub fn channel(size: u64) -> Self {
        Self::new("channel", size, 1, DimensionRole::Channel)
    }

    pub fn spatial(name: impl Into<String>, size: u64, role: DimensionRole) -> Self {
        Self::new(name, size, 1, role)
    }
}

/// Fixed dimension-index constants, used in place of magic numbers
/// throughout the processors.
pub mod convention {
    pub const TIME_DIM: usize = 0;
    pub const CHANNEL_DIM: usize = 1;
    pub const FRAME_DIM: usize = 0;
    pub const HEIGHT_DIM: usize = 1;
    pub const WIDTH_DIM: usize = 2;
    pub const COLOR_DIM: usize = 3;
    pub const FREQUENCY_DIM: usize = 1;
    pub const TIME_WINDOW_DIM: usize = 0;
    pub const DEFAULT_LAYOUT: super::MemoryLayout = super::MemoryLayout::RowMajor;
}

/// Expected dimension roles, in order, for a given modality. `TensorNd`
/// and `Unknown` accept any dimension list verbatim.
fn expected_roles(modality: Modality) -> Option<Vec<DimensionRole>> {
    use DimensionRole::*;
    match modality {
        Modality::Audio1D => Some(vec![Time]),
        Modality::AudioMultichannel => Some(vec![Time, Channel]),
        Modality::Image2D => Some(vec![SpatialY, SpatialX]),
        Modality::ImageColor => Some(vec![SpatialY, SpatialX, Channel]),
        Modality::VideoGrayscale => Some(vec![Time, SpatialY, SpatialX]),
        Modality::VideoColor => Some(vec![Time, SpatialY, SpatialX, Channel]),
        Modality::Spectral2D => Some(vec![Time, Frequency]),
        Modality::Volumetric3D => Some(vec![SpatialZ, SpatialY, SpatialX]),
        Modality::TensorNd | Modality::Unknown => None,
    }
}

/// Full structural description of a container: modality, organization,
/// memory layout and the ordered dimension list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureDescriptor {
    pub modality: Modality,
    pub organization: Organization,
    pub memory_layout: MemoryLayout,
    pub dimensions: Vec<DataDimension>,
}

impl StructureDescriptor {
    pub fn new(
        modality: Modality,
        organization: Organization,
        memory_layout: MemoryLayout,
        dimensions: Vec<DataDimension>,
    ) -> KakshyaResult<Self> {
        let descriptor = Self { modality, organization, memory_layout, dimensions };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Validates that the dimension list's role order/arity matches the
    /// modality's expected roles, unless the modality is TENSOR_ND or
    /// UNKNOWN (accepted verbatim).
    pub fn validate(&self) -> KakshyaResult<()> {
        if let Some(expected) = expected_roles(self.modality) {
            if expected.len() != self.dimensions.len() {
                return Err(KakshyaError::StructureValidation(format!(
                    "modality {:?} expects {} dimensions, got {}",
                    self.modality,
                    expected.len(),
                    self.dimensions.len()
                )));
            }
            for (i, (want, have)) in expected.iter().zip(self.dimensions.iter()).enumerate() {
                if *want != have.role {
                    return Err(KakshyaError::StructureValidation(format!(
                        "dimension {i}: expected role {want:?}, found {:?}",
                        have.role
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn total_elements(&self) -> u64 {
        self.dimensions.iter().map(|d| d.size).product()
    }

    /// Product of all non-primary-time dimensions.
    pub fn frame_size(&self) -> u64 {
        self.dimensions
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != convention::TIME_DIM)
            .map(|(_, d)| d.size)
            .product()
    }

    pub fn num_frames(&self) -> u64 {
        self.dimensions
            .get(convention::TIME_DIM)
            .map(|d| d.size)
            .unwrap_or(1)
    }

    pub fn channel_count(&self) -> u64 {
        self.dimensions
            .iter()
            .find(|d| d.role == DimensionRole::Channel)
            .map(|d| d.size)
            .unwrap_or(1)
    }

    /// Size of the `Time` dimension, found by role rather than by index
    /// (unlike `num_frames`, which always looks at `convention::TIME_DIM`).
    pub fn time_extent(&self) -> u64 {
        self.dimensions
            .iter()
            .find(|d| d.role == DimensionRole::Time)
            .map(|d| d.size)
            .unwrap_or(1)
    }

    pub fn width(&self) -> u64 {
        self.dimensions
            .iter()
            .find(|d| d.role == DimensionRole::SpatialX)
            .map(|d| d.size)
            .unwrap_or(1)
    }

    pub fn height(&self) -> u64 {
        self.dimensions
            .iter()
            .find(|d| d.role == DimensionRole::SpatialY)
            .map(|d| d.size)
            .unwrap_or(1)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width() * self.height()
    }

    pub fn audio_multichannel(
        organization: Organization,
        num_frames: u64,
        num_channels: u64,
    ) -> KakshyaResult<Self> {
        Self::new(
            Modality::AudioMultichannel,
            organization,
            MemoryLayout::RowMajor,
            vec![DataDimension::time(num_frames), DataDimension::channel(num_channels)],
        )
    }

    pub fn video_color(
        num_frames: u64,
        height: u64,
        width: u64,
    ) -> KakshyaResult<Self> {
        Self::new(
            Modality::VideoColor,
            Organization::Interleaved,
            MemoryLayout::RowMajor,
            vec![
                DataDimension::time(num_frames),
                DataDimension::spatial("height", height, DimensionRole::SpatialY),
                DataDimension::spatial("width", width, DimensionRole::SpatialX),
                DataDimension::channel(4),
            ],
        )
    }
}
