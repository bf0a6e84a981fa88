//! Build settings consumed by the texture pipeline.
//!
//! A [`BuildSettings`] value is populated by the caller (asset pipeline,
//! CLI) and treated as read-only by every pipeline stage. Raw effort and
//! tiling values are validated during parameter resolution, not here, so
//! out-of-range values degrade with a warning instead of failing the build.

use crate::color::LinearColor;
use crate::image::AddressMode;
use serde::{Deserialize, Serialize};

/// Topology of the texture being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureKind {
    /// Plain 2D texture, one slice.
    #[default]
    Texture2D,
    /// Array of independent 2D slices.
    Array,
    /// Cubemap, exactly 6 slices (or a long-lat source for HDR filtering).
    Cubemap,
    /// Cubemap array, slice count a multiple of 6.
    CubemapArray,
    /// Volume texture; slices are depth and halve along the chain.
    Volume,
}

/// How non-power-of-two sources are padded before mip generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PowerOfTwoMode {
    /// Leave dimensions untouched.
    #[default]
    None,
    /// Pad each dimension up to the next power of two.
    PadToPowerOfTwo,
    /// Pad both dimensions up to the larger next power of two.
    PadToSquarePowerOfTwo,
}

/// Mip filtering variant selected for a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MipFilter {
    /// Kernel-based downsample (box or sharpened, per kernel settings).
    #[default]
    Kernel,
    /// Nearest-sample copy, no filtering.
    Unfiltered,
    /// Cosine-lobe angular filtering for HDR cubemaps.
    Angular,
    /// Top mip only, no chain.
    NoMipmaps,
}

/// HSV-space color adjustment applied to the top mip.
///
/// Default values are the identity transform; the pipeline skips the pass
/// entirely when [`ColorAdjustment::is_identity`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorAdjustment {
    /// Multiplier on value (brightness), non-negative.
    pub brightness: f32,
    /// Exponent applied to value after brightness.
    pub brightness_curve: f32,
    /// Saturation boost weighted toward less-saturated colors.
    pub vibrance: f32,
    /// Saturation multiplier.
    pub saturation: f32,
    /// Exponent applied to the red channel after conversion back to RGB.
    pub rgb_curve: f32,
    /// Hue rotation in degrees, wrapped to [0, 360).
    pub hue: f32,
    /// Alpha remap lower bound.
    pub min_alpha: f32,
    /// Alpha remap upper bound.
    pub max_alpha: f32,
}

impl Default for ColorAdjustment {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            brightness_curve: 1.0,
            vibrance: 0.0,
            saturation: 1.0,
            rgb_curve: 1.0,
            hue: 0.0,
            min_alpha: 0.0,
            max_alpha: 1.0,
        }
    }
}

impl ColorAdjustment {
    /// True when every field is at its identity default.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Read-only inputs to a texture build.
///
/// Constructed with [`BuildSettings::new`] plus `with_*` helpers. The
/// pipeline never mutates a settings value; resolved working sizes are
/// reported back through the build output instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Human-authored target format name ("BC1", "AutoDXT", "BC7", ...).
    pub format_name: String,
    /// Upgrade BC2/BC3 targets to BC7.
    pub force_bc7: bool,
    /// Source RDO lambda, before the global multiplier. 0 disables RDO.
    pub lossy_compression_amount: f32,
    /// Global RDO lambda multiplier. Non-positive values degrade to 1.0.
    pub rdo_multiplier: f32,
    /// Raw effort level; validated during resolution (0, 10, 20, 30).
    pub effort_raw: u32,
    /// Raw universal tiling mode; validated during resolution (0, 1, 2).
    pub tiling_raw: u32,
    /// Emit debug colors instead of real content; forces lambda 0 and
    /// fastest effort.
    pub debug_color: bool,

    /// Mip filtering variant.
    pub mip_filter: MipFilter,
    /// Downsample kernel size. 2 is the plain box; 4, 6, 8 sharpen.
    pub kernel_size: u32,
    /// Sharpen factor for kernel sizes above 2.
    pub sharpen: f32,
    /// Emit sharpened mips but feed each next level from an unsharpened
    /// box downsample.
    pub downsample_with_average: bool,
    /// Rescale only luminance when sharpening to avoid hue shifts.
    pub sharpen_without_color_shift: bool,
    /// Edge addressing for kernel taps outside the slice.
    pub address_mode: AddressMode,
    /// Recompute the 2-texel border from border-only source texels.
    pub preserve_border: bool,
    /// Run the top-mip kernel pass (odd Gaussian, no half-texel shift).
    pub apply_kernel_to_top_mip: bool,

    /// Per-channel alpha-coverage thresholds; 0 disables a channel.
    pub alpha_coverage_thresholds: [f32; 4],
    /// HSV color adjustment for the top mip.
    pub color_adjustment: ColorAdjustment,
    /// Replace near-matches of a key color with transparent black.
    pub chroma_key: bool,
    /// Key color for chroma keying.
    pub chroma_key_color: LinearColor,
    /// Maximum per-channel distance for a chroma-key match.
    pub chroma_key_threshold: f32,

    /// Mip level at which angular filtering reaches the full diffuse
    /// convolution; 0 puts it at the last mip.
    pub diffuse_convolve_mip_level: u32,
    /// Renormalize texels after filtering (tangent-space normal maps).
    pub renormalize: bool,
    /// Invert the green channel (normal map Y convention).
    pub flip_green_channel: bool,
    /// Replicate the red channel into G, B and A.
    pub replicate_red: bool,
    /// Replicate the alpha channel into R, G and B.
    pub replicate_alpha: bool,
    /// Treat the texture as having alpha even if detection says opaque.
    pub force_alpha: bool,
    /// Ignore the alpha channel entirely.
    pub force_no_alpha: bool,

    /// Texture topology.
    pub kind: TextureKind,
    /// Power-of-two padding mode.
    pub pow2_mode: PowerOfTwoMode,
    /// Fill color for padded texels.
    pub padding_color: LinearColor,
    /// Integer-plus-fraction downscale applied to the top mip, 1.0 to 8.0.
    pub downscale: f32,
    /// Maximum output resolution; larger sources drop top mips. 0 means
    /// unlimited.
    pub max_texture_resolution: u32,

    /// Permit the scheduler and solvers to fan out onto the worker pool.
    /// Set false when the caller is itself a pool worker.
    pub allow_parallel: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            format_name: "AutoDXT".to_string(),
            force_bc7: false,
            lossy_compression_amount: 0.0,
            rdo_multiplier: 1.0,
            effort_raw: 20,
            tiling_raw: 0,
            debug_color: false,
            mip_filter: MipFilter::Kernel,
            kernel_size: 2,
            sharpen: 0.0,
            downsample_with_average: false,
            sharpen_without_color_shift: false,
            address_mode: AddressMode::Wrap,
            preserve_border: false,
            apply_kernel_to_top_mip: false,
            alpha_coverage_thresholds: [0.0; 4],
            color_adjustment: ColorAdjustment::default(),
            chroma_key: false,
            chroma_key_color: LinearColor::new(0.0, 0.0, 0.0, 1.0),
            chroma_key_threshold: 1.0 / 255.0,
            diffuse_convolve_mip_level: 0,
            renormalize: false,
            flip_green_channel: false,
            replicate_red: false,
            replicate_alpha: false,
            force_alpha: false,
            force_no_alpha: false,
            kind: TextureKind::Texture2D,
            pow2_mode: PowerOfTwoMode::None,
            padding_color: LinearColor::new(0.0, 0.0, 0.0, 1.0),
            downscale: 1.0,
            max_texture_resolution: 0,
            allow_parallel: true,
        }
    }
}

impl BuildSettings {
    /// Creates settings for the named target format with all defaults.
    pub fn new(format_name: impl Into<String>) -> Self {
        Self {
            format_name: format_name.into(),
            ..Self::default()
        }
    }

    /// Sets the RDO lambda source value.
    pub fn with_lossy_compression(mut self, amount: f32) -> Self {
        self.lossy_compression_amount = amount;
        self
    }

    /// Sets the downsample kernel size and sharpen factor.
    pub fn with_kernel(mut self, size: u32, sharpen: f32) -> Self {
        self.kernel_size = size;
        self.sharpen = sharpen;
        self
    }

    /// Sets the texture topology.
    pub fn with_kind(mut self, kind: TextureKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the mip filtering variant.
    pub fn with_mip_filter(mut self, filter: MipFilter) -> Self {
        self.mip_filter = filter;
        self
    }

    /// Enables or disables scheduler parallelism.
    pub fn with_parallelism(mut self, allow: bool) -> Self {
        self.allow_parallel = allow;
        self
    }

    /// Sets per-channel alpha-coverage thresholds.
    pub fn with_alpha_coverage(mut self, thresholds: [f32; 4]) -> Self {
        self.alpha_coverage_thresholds = thresholds;
        self
    }

    /// True if any alpha-coverage channel is enabled.
    pub fn alpha_coverage_enabled(&self) -> bool {
        self.alpha_coverage_thresholds.iter().any(|&t| t != 0.0)
    }

    /// True for cubemap and cubemap-array topologies.
    pub fn is_cubemap(&self) -> bool {
        matches!(self.kind, TextureKind::Cubemap | TextureKind::CubemapArray)
    }

    /// True for volume topology.
    pub fn is_volume(&self) -> bool {
        self.kind == TextureKind::Volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BuildSettings::default();
        assert_eq!(settings.format_name, "AutoDXT");
        assert_eq!(settings.kernel_size, 2);
        assert_eq!(settings.rdo_multiplier, 1.0);
        assert!(settings.allow_parallel);
        assert!(!settings.alpha_coverage_enabled());
    }

    #[test]
    fn test_builder_helpers() {
        let settings = BuildSettings::new("BC1")
            .with_lossy_compression(30.0)
            .with_kernel(6, 2.5)
            .with_kind(TextureKind::Cubemap)
            .with_parallelism(false);
        assert_eq!(settings.format_name, "BC1");
        assert_eq!(settings.lossy_compression_amount, 30.0);
        assert_eq!(settings.kernel_size, 6);
        assert_eq!(settings.sharpen, 2.5);
        assert!(settings.is_cubemap());
        assert!(!settings.allow_parallel);
    }

    #[test]
    fn test_color_adjustment_identity() {
        let identity = ColorAdjustment::default();
        assert!(identity.is_identity());
        let adjusted = ColorAdjustment {
            saturation: 1.5,
            ..Default::default()
        };
        assert!(!adjusted.is_identity());
    }

    #[test]
    fn test_alpha_coverage_enabled() {
        let settings = BuildSettings::default().with_alpha_coverage([0.0, 0.0, 0.0, 0.5]);
        assert!(settings.alpha_coverage_enabled());
    }
}
