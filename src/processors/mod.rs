pub mod contiguous;
pub mod dynamic_region;
pub mod frame_atomic;
pub mod region_base;
pub mod region_organization;
pub mod spatial;

pub use contiguous::ContiguousAccessProcessor;
pub use dynamic_region::DynamicRegionProcessor;
pub use frame_atomic::FrameAccessProcessor;
pub use region_base::RegionProcessorBase;
pub use region_organization::RegionOrganizationProcessor;
pub use spatial::SpatialRegionProcessor;
