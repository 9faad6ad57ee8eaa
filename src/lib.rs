//! # Kakshya core
//!
//! Data model and processing substrate for N-dimensional streaming
//! signal containers (audio, video, spectral, tensor), the processor
//! family that reads from and writes into them (contiguous, frame-
//! atomic, region-organizing, spatial, dynamic), and the
//! container-specific processing chain that coordinates them.
//!
//! ## Layout
//!
//! - [`structure`]: modality, organization, memory layout, dimensions.
//! - [`variant`]: the tagged scalar/complex sequence union.
//! - [`coord`]: index math and region sweep/advance helpers shared by
//!   every processor family.
//! - [`region`]: `Region`, `RegionSegment`, `RegionGroup`,
//!   `OrganizedRegion`, and the LRU region cache manager.
//! - [`container`]: the container trait hierarchy and two minimal
//!   concrete containers (audio, video).
//! - [`processing`]: `DataProcessor` and `DataProcessingChain`.
//! - [`processors`]: the concrete processor family.

pub mod container;
pub mod coord;
pub mod error;
pub mod processing;
pub mod processors;
pub mod region;
pub mod structure;
pub mod variant;

pub use error::{KakshyaError, KakshyaResult};
