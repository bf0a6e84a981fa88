//! Error taxonomy for the texture build pipeline.
//!
//! Three tiers, matching how failures propagate:
//!
//! - [`ValidationError`]: the build request itself is unusable. Detected
//!   before any filtering or encoding work starts; the build fails with no
//!   partial output.
//! - [`EncodeError`]: the block encoder rejected a mip. Terminal for the
//!   whole chain; a partially compressed texture is never emitted.
//! - Config warnings (out-of-range effort level, tiling mode, non-positive
//!   lambda multiplier) are not errors at all: they are absorbed locally by
//!   substituting a documented default and logging via `tracing::warn`.

use crate::encode::format::BlockFormat;
use thiserror::Error;

/// Build-request validation failures, detected before any encode work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Source dimensions exceed what the compressor can accept and the
    /// image cannot be resized (non-power-of-two sources are rejected
    /// rather than silently stretched).
    #[error("source image {width}x{height} (npot) prevents resizing and exceeds compressor max dimension {max_dimension}")]
    NonPowerOfTwoTooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
    },

    /// Cubemap sources must carry exactly 6 slices, or a multiple of 6 for
    /// cube arrays.
    #[error("cubemap source has {slices} slices, expected {expected}")]
    CubemapSliceCount { slices: u32, expected: &'static str },

    /// A pixel buffer whose length does not match
    /// `width * height * slices * bytes_per_pixel`.
    #[error("pixel buffer length {actual} does not match expected {expected} bytes")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The build settings name a texture format with no known block format.
    #[error("unknown texture format name '{0}'")]
    UnknownFormat(String),

    /// Leave-existing-mips was requested but every provided mip is larger
    /// than the compressor allows.
    #[error("no usable source mips: {provided} provided, first usable would be mip {first_usable}")]
    NoUsableSourceMips { provided: u32, first_usable: u32 },

    /// An empty source mip array.
    #[error("source mip array is empty")]
    EmptySource,
}

/// Failures reported by a [`crate::encode::BlockEncoder`] implementation.
///
/// The encoder contract requires an enumerable error on failure and forbids
/// partially written output, so these map one-to-one onto the vendor error
/// codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The encoder does not implement this block format.
    #[error("block format {0} is not supported by this encoder")]
    UnsupportedFormat(BlockFormat),

    /// The prepared input surface did not match the encoder's expectations.
    #[error("invalid encoder input: {0}")]
    InvalidInput(String),

    /// Any other encoder-internal failure, carrying the vendor message.
    #[error("encoder internal error: {0}")]
    Internal(String),
}

/// Top-level error for a texture build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Encoding failed for a specific mip. The whole chain is discarded.
    #[error("compression failed at mip {mip}: {source}")]
    Encode {
        mip: usize,
        #[source]
        source: EncodeError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::CubemapSliceCount {
            slices: 5,
            expected: "exactly 6",
        };
        assert_eq!(
            err.to_string(),
            "cubemap source has 5 slices, expected exactly 6"
        );
    }

    #[test]
    fn test_encode_error_wraps_with_mip_index() {
        let err = TextureError::Encode {
            mip: 3,
            source: EncodeError::Internal("oops".to_string()),
        };
        assert!(err.to_string().contains("mip 3"));
    }

    #[test]
    fn test_validation_converts_into_texture_error() {
        let err: TextureError = ValidationError::EmptySource.into();
        assert!(matches!(err, TextureError::Validation(_)));
    }
}
