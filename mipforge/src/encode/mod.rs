//! Block compression: format resolution, parameter resolution, the
//! encoder contract, the built-in encoder, and the chain scheduler.

pub mod adapter;
pub mod encoder;
pub mod format;
pub mod params;
pub mod reference;
pub mod scheduler;

pub use encoder::{BlockEncoder, CompressedImage, EncoderCapabilities};
pub use format::{BlockFormat, FormatTable};
pub use params::{resolve_encode_params, EffortLevel, EncodeParams, TilingMode};
pub use reference::ReferenceEncoder;
pub use scheduler::{compress_mip_chain, MIN_ASYNC_COMPRESSION_SIZE};
