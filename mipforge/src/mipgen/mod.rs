//! Mip chain generation: kernels, resampling, coverage preservation, the
//! chain driver and the angular cubemap path.

pub mod adjust;
pub mod alpha;
pub mod angular;
pub mod chain;
pub mod kernel;
pub mod resample;

pub use chain::{generate_mip_chain, generate_top_mip, mip_count};
pub use kernel::FilterKernel;
