//! The opaque block encoder contract.

use crate::encode::format::BlockFormat;
use crate::encode::params::EncodeParams;
use crate::error::EncodeError;
use crate::image::Image;

/// Encoder properties the scheduler and validation need up front.
#[derive(Debug, Clone, Copy)]
pub struct EncoderCapabilities {
    /// Largest supported surface extent per axis.
    pub max_dimension: usize,
    /// Number of trailing mips the encoder packs into one tail blob.
    /// 1 means no tail merging.
    pub mips_in_tail: usize,
    /// Opaque format-specific data, round-tripped to the container writer
    /// without interpretation.
    pub extension_data: u32,
}

impl Default for EncoderCapabilities {
    fn default() -> Self {
        Self {
            max_dimension: 16384,
            mips_in_tail: 1,
            extension_data: 0,
        }
    }
}

/// One compressed mip (or merged mip tail). Dimensions are the logical
/// pixel extents rounded up to block multiples; tail slots past the first
/// carry dimensions only, their data lives in the first tail slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub format: BlockFormat,
}

/// A block compression encoder.
///
/// `encode` receives one or more consecutive mips already converted to the
/// exact input layout the target format requires (BGRA8 for the 8-bit
/// formats, RGBA16F for HDR) and returns the packed blocks for all slices
/// of all mips, largest mip first.
///
/// Implementations must be deterministic: identical input bytes and
/// parameters produce identical output bytes regardless of
/// `job_parallelism`, which is only a hint for internal threading. On
/// failure no partial output is returned.
pub trait BlockEncoder: Send + Sync {
    fn capabilities(&self) -> EncoderCapabilities;

    fn encode(
        &self,
        format: BlockFormat,
        mips: &[Image],
        params: &EncodeParams,
        job_parallelism: usize,
    ) -> Result<Vec<u8>, EncodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capabilities() {
        let caps = EncoderCapabilities::default();
        assert_eq!(caps.mips_in_tail, 1);
        assert_eq!(caps.extension_data, 0);
        assert!(caps.max_dimension >= 4096);
    }
}
