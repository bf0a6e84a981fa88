//! Bridge between the linear-float mip chain and a block encoder.
//!
//! Converts each mip to the exact input layout its target format wants,
//! runs one encode call over the whole group, and wraps the packed
//! blocks in a [`CompressedImage`]. On failure nothing is written.

use crate::color::LinearColor;
use crate::encode::encoder::{BlockEncoder, CompressedImage};
use crate::encode::format::{BlockFormat, BLOCK_DIM};
use crate::encode::params::EncodeParams;
use crate::error::EncodeError;
use crate::image::{convert, GammaSpace, Image};
use tracing::trace;

/// Solid fill used in debug-color mode, one tint per format so a
/// misrouted format is visible at a glance.
fn debug_fill_color(format: BlockFormat) -> LinearColor {
    match format {
        BlockFormat::Bc1 => LinearColor::new(1.0, 0.0, 0.0, 1.0),
        BlockFormat::Bc2 => LinearColor::new(1.0, 0.0, 1.0, 1.0),
        BlockFormat::Bc3 => LinearColor::new(1.0, 1.0, 0.0, 1.0),
        BlockFormat::Bc4 => LinearColor::new(0.5, 0.5, 0.5, 1.0),
        BlockFormat::Bc5 => LinearColor::new(0.0, 0.0, 1.0, 1.0),
        BlockFormat::Bc6h => LinearColor::new(0.0, 1.0, 0.0, 1.0),
        BlockFormat::Bc7 => LinearColor::new(1.0, 1.0, 1.0, 1.0),
    }
}

/// Convert one linear RGBA32F mip into the encoder input for `format`.
fn prepare_input(mip: &Image, params: &EncodeParams) -> Image {
    let source;
    let mip = if params.debug_color {
        let mut filled = Image::new_rgba32f(mip.width(), mip.height(), mip.num_slices());
        let fill = debug_fill_color(params.format);
        for c in filled.colors_mut() {
            *c = fill;
        }
        source = filled;
        &source
    } else {
        mip
    };

    if params.format.is_hdr() {
        convert::to_rgba16f(mip)
    } else if params.format.expects_srgb_input() {
        convert::to_bgra8(mip, GammaSpace::Srgb)
    } else {
        // single/two channel formats carry non-color data
        convert::to_bgra8(mip, GammaSpace::Linear)
    }
}

/// Pixel extent rounded up to a whole number of blocks.
fn block_aligned(extent: usize) -> usize {
    BlockFormat::blocks_for(extent) * BLOCK_DIM
}

/// Encode a group of consecutive mips (one mip normally, several when
/// the encoder merges a mip tail) into one compressed surface.
///
/// The returned image carries the first mip's block-aligned extents and
/// the packed blocks of every slice of every mip in the group, largest
/// first.
///
/// # Errors
///
/// Propagates the encoder's error untouched; no partial output exists
/// on failure.
pub fn encode_mip_group(
    encoder: &dyn BlockEncoder,
    mips: &[Image],
    params: &EncodeParams,
    job_parallelism: usize,
) -> Result<CompressedImage, EncodeError> {
    debug_assert!(!mips.is_empty());
    let prepared: Vec<Image> = mips.iter().map(|m| prepare_input(m, params)).collect();

    trace!(
        format = %params.format,
        width = mips[0].width(),
        height = mips[0].height(),
        group = mips.len(),
        "encoding mip group"
    );
    let data = encoder.encode(params.format, &prepared, params, job_parallelism)?;

    Ok(CompressedImage {
        data,
        width: block_aligned(mips[0].width()),
        height: block_aligned(mips[0].height()),
        depth: mips[0].num_slices(),
        format: params.format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::format::FormatTable;
    use crate::encode::params::resolve_encode_params;
    use crate::encode::reference::ReferenceEncoder;
    use crate::settings::BuildSettings;

    fn params_for(name: &str, debug_color: bool) -> EncodeParams {
        let mut settings = BuildSettings::new(name);
        settings.debug_color = debug_color;
        resolve_encode_params(&settings, false, &FormatTable::standard()).unwrap()
    }

    fn solid_mip(width: usize, height: usize, color: LinearColor) -> Image {
        let mut mip = Image::new_rgba32f(width, height, 1);
        for c in mip.colors_mut() {
            *c = color;
        }
        mip
    }

    #[test]
    fn test_encode_group_dims_are_block_aligned() {
        let mip = solid_mip(10, 6, LinearColor::new(0.2, 0.4, 0.6, 1.0));
        let params = params_for("BC1", false);
        let out = encode_mip_group(&ReferenceEncoder::new(), &[mip], &params, 1).unwrap();
        assert_eq!(out.width, 12);
        assert_eq!(out.height, 8);
        assert_eq!(out.depth, 1);
        assert_eq!(out.data.len(), 3 * 2 * 8);
    }

    #[test]
    fn test_debug_color_overrides_content() {
        let mip = solid_mip(4, 4, LinearColor::new(0.1, 0.9, 0.3, 1.0));
        let params = params_for("BC1", true);
        let out = encode_mip_group(&ReferenceEncoder::new(), &[mip], &params, 1).unwrap();
        // BC1 debug tint is pure red: one solid block with red endpoints
        let c0 = u16::from_le_bytes([out.data[0], out.data[1]]);
        assert_eq!(c0, 0xF800);
    }

    #[test]
    fn test_unsupported_format_propagates() {
        let mip = solid_mip(4, 4, LinearColor::new(1.0, 1.0, 1.0, 1.0));
        let params = params_for("BC7", false);
        let err = encode_mip_group(&ReferenceEncoder::new(), &[mip], &params, 1).unwrap_err();
        assert_eq!(err, EncodeError::UnsupportedFormat(BlockFormat::Bc7));
    }

    #[test]
    fn test_group_packs_all_mips() {
        let mips = [
            solid_mip(8, 8, LinearColor::new(1.0, 1.0, 1.0, 1.0)),
            solid_mip(4, 4, LinearColor::new(1.0, 1.0, 1.0, 1.0)),
            solid_mip(2, 2, LinearColor::new(1.0, 1.0, 1.0, 1.0)),
        ];
        let params = params_for("BC1", false);
        let out = encode_mip_group(&ReferenceEncoder::new(), &mips, &params, 1).unwrap();
        assert_eq!(out.width, 8);
        assert_eq!(out.height, 8);
        // 4 blocks + 1 block + 1 block
        assert_eq!(out.data.len(), (4 + 1 + 1) * 8);
    }
}
