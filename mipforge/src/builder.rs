//! End-to-end texture build orchestration.
//!
//! A [`TextureBuilder`] owns the format table and a block encoder and
//! turns one source image plus settings into a compressed mip chain:
//! validate, convert to linear float, pad and downscale, generate mips,
//! run the channel post passes, resolve encode parameters, schedule
//! compression.

use crate::encode::{
    compress_mip_chain, BlockEncoder, BlockFormat, CompressedImage, FormatTable, ReferenceEncoder,
};
use crate::error::{TextureError, ValidationError};
use crate::image::{convert, Image, PixelFormat};
use crate::mipgen::adjust::{
    adjust_image_colors, flip_green_channel, normalize_mip, replicate_alpha_channel,
    replicate_red_channel, resolve_has_alpha,
};
use crate::mipgen::angular::{generate_angular_filtered_mips, generate_base_cube_mip_from_long_lat};
use crate::mipgen::resample::{downscale_image, DownscaleFilter};
use crate::mipgen::{generate_mip_chain, generate_top_mip, mip_count};
use crate::settings::{BuildSettings, MipFilter, PowerOfTwoMode, TextureKind};
use tracing::{debug, info};

/// Result of a successful build: the compressed chain plus the resolved
/// layout a container writer needs.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Compressed mips, largest first. Tail slots past the first merged
    /// tail mip carry dimensions only.
    pub mips: Vec<CompressedImage>,
    /// Resolved top mip width, after padding and downscale.
    pub top_width: usize,
    /// Resolved top mip height, after padding and downscale.
    pub top_height: usize,
    /// Resolved slice count (6 faces for a cubemap built from long-lat).
    pub num_slices: usize,
    pub format: BlockFormat,
    pub has_alpha: bool,
    /// Number of trailing mips merged into the tail blob, 1 for none.
    pub mips_in_tail: usize,
    /// Encoder extension data, passed through to the container writer.
    pub extension_data: u32,
}

/// Builds compressed textures from source images.
pub struct TextureBuilder<E> {
    encoder: E,
    formats: FormatTable,
}

impl Default for TextureBuilder<ReferenceEncoder> {
    fn default() -> Self {
        Self::new(ReferenceEncoder::new())
    }
}

impl<E: BlockEncoder> TextureBuilder<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            formats: FormatTable::standard(),
        }
    }

    pub fn with_format_table(mut self, formats: FormatTable) -> Self {
        self.formats = formats;
        self
    }

    /// Runs the whole pipeline for one texture.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] variants for an unusable request, detected
    /// before any encode work; [`TextureError::Encode`] when the block
    /// encoder fails, in which case no output exists.
    pub fn build(
        &self,
        source: &Image,
        settings: &BuildSettings,
    ) -> Result<BuildOutput, TextureError> {
        let caps = self.encoder.capabilities();
        validate_source(source, settings, caps.max_dimension)?;

        let hdr_source = matches!(
            source.format(),
            PixelFormat::Rgba16F | PixelFormat::Rgba32F | PixelFormat::Bgre8 | PixelFormat::R16F
        );
        let has_alpha = resolve_has_alpha(source, settings);

        let mut base = convert::to_rgba32f(source);
        base = pad_to_power_of_two(&base, settings);
        if settings.mip_filter == MipFilter::NoMipmaps && settings.downscale > 1.0 {
            base = downscale_image(
                &base,
                settings.downscale,
                crate::encode::format::BLOCK_DIM,
                downscale_filter_for(settings),
                settings.allow_parallel,
            );
        }
        base = reduce_to_limit(base, settings, caps.max_dimension);

        let mips = if settings.kind == TextureKind::Cubemap
            && settings.mip_filter == MipFilter::Angular
        {
            self.angular_mips(base, settings, caps.max_dimension)
        } else {
            self.kernel_mips(base, settings, hdr_source)
        };
        let mut mips = mips;

        run_post_passes(&mut mips, settings);

        let params = crate::encode::resolve_encode_params(settings, has_alpha, &self.formats)
            .map_err(TextureError::Validation)?;
        let compressed =
            compress_mip_chain(&self.encoder, &mips, &params, settings.allow_parallel)?;

        let top = &mips[0];
        info!(
            width = top.width(),
            height = top.height(),
            levels = compressed.len(),
            format = %params.format,
            "texture build complete"
        );
        Ok(BuildOutput {
            top_width: top.width(),
            top_height: top.height(),
            num_slices: top.num_slices(),
            format: params.format,
            has_alpha,
            mips_in_tail: caps.mips_in_tail,
            extension_data: caps.extension_data,
            mips: compressed,
        })
    }

    /// Kernel-filtered path: top mip passes, then the halving chain.
    fn kernel_mips(
        &self,
        mut base: Image,
        settings: &BuildSettings,
        hdr_source: bool,
    ) -> Vec<Image> {
        adjust_image_colors(&mut base, settings, hdr_source);
        if settings.apply_kernel_to_top_mip {
            base = generate_top_mip(&base, settings);
        }
        if settings.renormalize {
            normalize_mip(&mut base);
        }

        let mut rest = Vec::new();
        if settings.mip_filter != MipFilter::NoMipmaps {
            generate_mip_chain(settings, &base, &mut rest, u32::MAX);
        }
        let mut mips = Vec::with_capacity(1 + rest.len());
        mips.push(base);
        mips.append(&mut rest);
        mips
    }

    /// Angular path for HDR cubemaps: 6-face base (projected from a
    /// long-lat source when the input has one slice), then cosine-lobe
    /// filtered levels replacing the whole chain.
    fn angular_mips(
        &self,
        base: Image,
        settings: &BuildSettings,
        max_dimension: usize,
    ) -> Vec<Image> {
        let base = if base.num_slices() == 1 {
            let limit = if settings.max_texture_resolution > 0 {
                settings.max_texture_resolution as usize
            } else {
                max_dimension
            };
            generate_base_cube_mip_from_long_lat(&base, limit)
        } else {
            base
        };

        let num_mips = mip_count(base.width(), base.height());
        let mut chain = vec![base];
        generate_angular_filtered_mips(
            &mut chain,
            num_mips,
            settings.diffuse_convolve_mip_level,
            settings.allow_parallel,
        );
        chain
    }
}

fn validate_source(
    source: &Image,
    settings: &BuildSettings,
    max_dimension: usize,
) -> Result<(), ValidationError> {
    if source.width() == 0 || source.height() == 0 || source.num_slices() == 0 {
        return Err(ValidationError::EmptySource);
    }

    match settings.kind {
        TextureKind::Cubemap => {
            // a single slice is a long-lat source for the angular path
            let long_lat =
                settings.mip_filter == MipFilter::Angular && source.num_slices() == 1;
            if !long_lat && source.num_slices() != 6 {
                return Err(ValidationError::CubemapSliceCount {
                    slices: source.num_slices() as u32,
                    expected: "exactly 6",
                });
            }
        }
        TextureKind::CubemapArray => {
            if source.num_slices() % 6 != 0 {
                return Err(ValidationError::CubemapSliceCount {
                    slices: source.num_slices() as u32,
                    expected: "a multiple of 6",
                });
            }
        }
        _ => {}
    }

    let pow2 = source.width().is_power_of_two() && source.height().is_power_of_two();
    let oversized = source.width() > max_dimension || source.height() > max_dimension;
    if oversized && !pow2 && settings.pow2_mode == PowerOfTwoMode::None {
        return Err(ValidationError::NonPowerOfTwoTooLarge {
            width: source.width() as u32,
            height: source.height() as u32,
            max_dimension: max_dimension as u32,
        });
    }
    Ok(())
}

fn downscale_filter_for(settings: &BuildSettings) -> DownscaleFilter {
    if settings.mip_filter == MipFilter::Unfiltered {
        DownscaleFilter::Unfiltered
    } else if settings.sharpen > 0.0 {
        // sharpen factor 0..2 maps back onto the 0..10 level scale
        DownscaleFilter::Sharpen((settings.sharpen * 5.0).clamp(0.0, 10.0) as u8)
    } else {
        DownscaleFilter::SimpleAverage
    }
}

/// Pads a linear image up to power-of-two extents with the configured
/// padding color. Source texels keep their position at the origin.
fn pad_to_power_of_two(src: &Image, settings: &BuildSettings) -> Image {
    let (target_w, target_h) = match settings.pow2_mode {
        PowerOfTwoMode::None => return src.clone(),
        PowerOfTwoMode::PadToPowerOfTwo => (
            src.width().next_power_of_two(),
            src.height().next_power_of_two(),
        ),
        PowerOfTwoMode::PadToSquarePowerOfTwo => {
            let extent = src
                .width()
                .next_power_of_two()
                .max(src.height().next_power_of_two());
            (extent, extent)
        }
    };
    if target_w == src.width() && target_h == src.height() {
        return src.clone();
    }

    debug!(
        from_width = src.width(),
        from_height = src.height(),
        to_width = target_w,
        to_height = target_h,
        "padding to power of two"
    );
    let mut out = Image::new_rgba32f(target_w, target_h, src.num_slices());
    for c in out.colors_mut() {
        *c = settings.padding_color;
    }
    for slice in 0..src.num_slices() {
        let src_pixels = src.slice_colors(slice);
        let dst_pixels = out.slice_colors_mut(slice);
        for y in 0..src.height() {
            let src_row = &src_pixels[y * src.width()..(y + 1) * src.width()];
            dst_pixels[y * target_w..y * target_w + src.width()].copy_from_slice(src_row);
        }
    }
    out
}

/// Halves the base until it fits both the configured maximum resolution
/// and the encoder's dimension limit, using the configured kernel so
/// dropped top mips match what the chain would have produced.
fn reduce_to_limit(mut base: Image, settings: &BuildSettings, max_dimension: usize) -> Image {
    let limit = if settings.max_texture_resolution > 0 {
        (settings.max_texture_resolution as usize).min(max_dimension)
    } else {
        max_dimension
    };
    while base.width().max(base.height()) > limit {
        let mut next = Vec::with_capacity(1);
        generate_mip_chain(settings, &base, &mut next, 1);
        match next.pop() {
            Some(reduced) => base = reduced,
            None => break,
        }
    }
    base
}

/// Channel post passes applied to every generated mip.
fn run_post_passes(mips: &mut [Image], settings: &BuildSettings) {
    if settings.renormalize {
        // the top mip was normalized before chain generation
        for mip in mips.iter_mut().skip(1) {
            normalize_mip(mip);
        }
    }
    if settings.flip_green_channel {
        for mip in mips.iter_mut() {
            flip_green_channel(mip);
        }
    }
    if settings.replicate_red {
        replicate_red_channel(mips);
    }
    if settings.replicate_alpha {
        replicate_alpha_channel(mips);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::LinearColor;
    use crate::encode::{EncodeParams, EncoderCapabilities};
    use crate::error::EncodeError;
    use crate::image::GammaSpace;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn solid_bgra(width: usize, height: usize, slices: usize, bgra: [u8; 4]) -> Image {
        let mut data = Vec::with_capacity(width * height * slices * 4);
        for _ in 0..width * height * slices {
            data.extend_from_slice(&bgra);
        }
        Image::from_raw(
            data,
            width,
            height,
            slices,
            PixelFormat::Bgra8,
            GammaSpace::Srgb,
        )
        .unwrap()
    }

    #[test]
    fn test_solid_red_full_chain() {
        let source = solid_bgra(256, 256, 1, [0, 0, 255, 255]);
        let builder = TextureBuilder::default();
        let settings = BuildSettings::new("AutoDXT");
        let output = builder.build(&source, &settings).unwrap();

        assert_eq!(output.format, BlockFormat::Bc1);
        assert!(!output.has_alpha);
        assert_eq!(output.mips.len(), 9);
        let mut extent = 256usize;
        for mip in &output.mips {
            let blocks = extent.div_ceil(4);
            assert_eq!(mip.data.len(), blocks * blocks * 8);
            // solid red survives filtering and encoding exactly
            let c0 = u16::from_le_bytes([mip.data[0], mip.data[1]]);
            assert_eq!(c0, 0xF800);
            extent = (extent / 2).max(1);
        }
    }

    #[test]
    fn test_alpha_selects_bc3() {
        let source = solid_bgra(16, 16, 1, [10, 20, 30, 128]);
        let builder = TextureBuilder::default();
        let output = builder.build(&source, &BuildSettings::new("AutoDXT")).unwrap();
        assert!(output.has_alpha);
        assert_eq!(output.format, BlockFormat::Bc3);
    }

    #[test]
    fn test_no_mipmaps_single_level() {
        let source = solid_bgra(32, 32, 1, [0, 0, 0, 255]);
        let builder = TextureBuilder::default();
        let mut settings = BuildSettings::new("BC1");
        settings.mip_filter = MipFilter::NoMipmaps;
        let output = builder.build(&source, &settings).unwrap();
        assert_eq!(output.mips.len(), 1);
    }

    #[test]
    fn test_pad_to_power_of_two() {
        let source = solid_bgra(20, 12, 1, [0, 255, 0, 255]);
        let builder = TextureBuilder::default();
        let mut settings = BuildSettings::new("BC1");
        settings.pow2_mode = PowerOfTwoMode::PadToPowerOfTwo;
        let output = builder.build(&source, &settings).unwrap();
        assert_eq!(output.top_width, 32);
        assert_eq!(output.top_height, 16);
    }

    #[test]
    fn test_pad_to_square_power_of_two() {
        let source = solid_bgra(20, 12, 1, [0, 255, 0, 255]);
        let builder = TextureBuilder::default();
        let mut settings = BuildSettings::new("BC1");
        settings.pow2_mode = PowerOfTwoMode::PadToSquarePowerOfTwo;
        let output = builder.build(&source, &settings).unwrap();
        assert_eq!(output.top_width, 32);
        assert_eq!(output.top_height, 32);
    }

    #[test]
    fn test_max_resolution_drops_top_mips() {
        let source = solid_bgra(64, 64, 1, [255, 255, 255, 255]);
        let builder = TextureBuilder::default();
        let mut settings = BuildSettings::new("BC1");
        settings.max_texture_resolution = 16;
        let output = builder.build(&source, &settings).unwrap();
        assert_eq!(output.top_width, 16);
        assert_eq!(output.mips.len(), 5);
    }

    /// Encoder that counts encode calls, for proving validation happens
    /// before any encode work.
    struct CountingEncoder(AtomicUsize);

    impl BlockEncoder for CountingEncoder {
        fn capabilities(&self) -> EncoderCapabilities {
            EncoderCapabilities::default()
        }

        fn encode(
            &self,
            format: BlockFormat,
            mips: &[Image],
            params: &EncodeParams,
            job_parallelism: usize,
        ) -> Result<Vec<u8>, EncodeError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            ReferenceEncoder::new().encode(format, mips, params, job_parallelism)
        }
    }

    #[test]
    fn test_bad_cubemap_fails_before_encode() {
        let source = solid_bgra(8, 8, 5, [0, 0, 0, 255]);
        let builder = TextureBuilder::new(CountingEncoder(AtomicUsize::new(0)));
        let mut settings = BuildSettings::new("BC1");
        settings.kind = TextureKind::Cubemap;
        let err = builder.build(&source, &settings).unwrap_err();
        assert!(matches!(
            err,
            TextureError::Validation(ValidationError::CubemapSliceCount { slices: 5, .. })
        ));
        assert_eq!(builder.encoder.0.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_cubemap_array_slice_multiple() {
        let source = solid_bgra(8, 8, 12, [0, 0, 0, 255]);
        let builder = TextureBuilder::default();
        let mut settings = BuildSettings::new("BC1");
        settings.kind = TextureKind::CubemapArray;
        let output = builder.build(&source, &settings).unwrap();
        assert_eq!(output.num_slices, 12);
    }

    #[test]
    fn test_replicate_red_spreads_channel() {
        // red-only source; after replication alpha is red, so a BC3
        // build carries that value in the alpha block endpoints
        let source = solid_bgra(8, 8, 1, [0, 0, 200, 255]);
        let builder = TextureBuilder::default();
        let mut settings = BuildSettings::new("BC3");
        settings.replicate_red = true;
        let output = builder.build(&source, &settings).unwrap();
        let alpha_e0 = output.mips[0].data[0];
        assert!(alpha_e0 > 100, "alpha endpoint should carry the red value");
    }

    #[test]
    fn test_volume_depth_halves() {
        let source = solid_bgra(8, 8, 4, [50, 60, 70, 255]);
        let builder = TextureBuilder::default();
        let mut settings = BuildSettings::new("BC1");
        settings.kind = TextureKind::Volume;
        let output = builder.build(&source, &settings).unwrap();
        // 8x8x4 -> 4x4x2 -> 2x2x1 -> 1x1x1
        assert_eq!(output.mips.len(), 4);
        assert_eq!(output.mips[0].depth, 4);
        assert_eq!(output.mips[1].depth, 2);
        assert_eq!(output.mips[2].depth, 1);
        assert_eq!(output.mips[3].depth, 1);
    }
}
