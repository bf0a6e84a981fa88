//! Per-texel adjustment passes applied around mip generation.
//!
//! Color adjustment runs on the top mip before the chain is built; the
//! channel replication passes run on the finished chain. All of these
//! operate in place on RGBA32F data.

use crate::color::{LinearColor, TRANSPARENT};
use crate::image::{Image, PixelFormat};
use crate::settings::BuildSettings;
use rayon::prelude::*;

const NEARLY: f32 = 1e-4;
const SMALL: f32 = 1e-8;

fn adjust_one(color: LinearColor, settings: &BuildSettings, hdr_source: bool) -> LinearColor {
    let params = &settings.color_adjustment;
    let mut original = color;

    if settings.chroma_key
        && original.nearly_equals(&settings.chroma_key_color, settings.chroma_key_threshold + SMALL)
    {
        original = TRANSPARENT;
    }

    let mut hsv = original.to_hsv();
    let original_value = hsv.b;

    hsv.b *= params.brightness;
    if (params.brightness_curve - 1.0).abs() > NEARLY && params.brightness_curve != 0.0 {
        hsv.b = hsv.b.powf(params.brightness_curve);
    }

    if params.vibrance.abs() > NEARLY {
        // weight the boost toward less saturated colors
        let inv_sat_raised = (1.0 - hsv.g).powf(5.0);
        hsv.g += params.vibrance.clamp(0.0, 1.0) * 0.5 * inv_sat_raised;
    }
    hsv.g = (hsv.g * params.saturation).clamp(0.0, 1.0);

    hsv.r = (hsv.r + params.hue).rem_euclid(360.0);

    if !hdr_source {
        hsv.b = hsv.b.clamp(0.0, 1.0);
    }

    let mut adjusted = LinearColor::from_hsv(hsv);

    if (params.rgb_curve - 1.0).abs() > NEARLY && params.rgb_curve != 0.0 {
        adjusted.r = adjusted.r.powf(params.rgb_curve);
        adjusted.g = adjusted.g.powf(params.rgb_curve);
        adjusted.b = adjusted.b.powf(params.rgb_curve);
    }

    if hdr_source {
        let ceiling = original_value.max(1.0);
        adjusted.r = adjusted.r.clamp(0.0, ceiling);
        adjusted.g = adjusted.g.clamp(0.0, ceiling);
        adjusted.b = adjusted.b.clamp(0.0, ceiling);
    }

    adjusted.a = params.min_alpha + (params.max_alpha - params.min_alpha) * original.a;
    adjusted
}

/// Applies the HSV color adjustment (and chroma key) to every texel.
/// Does nothing when the adjustment is the identity and chroma keying is
/// off.
pub fn adjust_image_colors(image: &mut Image, settings: &BuildSettings, hdr_source: bool) {
    if settings.color_adjustment.is_identity() && !settings.chroma_key {
        return;
    }

    let parallel = settings.allow_parallel;
    let colors = image.colors_mut();
    if parallel {
        colors
            .par_iter_mut()
            .for_each(|c| *c = adjust_one(*c, settings, hdr_source));
    } else {
        for c in colors.iter_mut() {
            *c = adjust_one(*c, settings, hdr_source);
        }
    }
}

/// Renormalizes texels interpreted as packed tangent-space normals.
/// Degenerate vectors become zero, matching safe-normalize semantics.
pub fn normalize_mip(image: &mut Image) {
    for color in image.colors_mut() {
        let x = color.r * 2.0 - 1.0;
        let y = color.g * 2.0 - 1.0;
        let z = color.b * 2.0 - 1.0;
        let len = (x * x + y * y + z * z).sqrt();
        let (x, y, z) = if len < 1e-8 {
            (0.0, 0.0, 0.0)
        } else {
            (x / len, y / len, z / len)
        };
        color.r = x * 0.5 + 0.5;
        color.g = y * 0.5 + 0.5;
        color.b = z * 0.5 + 0.5;
    }
}

/// Inverts the green channel (normal map Y convention flip).
pub fn flip_green_channel(image: &mut Image) {
    for color in image.colors_mut() {
        color.g = 1.0 - color.g.clamp(0.0, 1.0);
    }
}

/// Replicates the red channel into all four channels of every mip.
pub fn replicate_red_channel(mips: &mut [Image]) {
    for mip in mips {
        for color in mip.colors_mut() {
            *color = LinearColor::new(color.r, color.r, color.r, color.r);
        }
    }
}

/// Replicates the alpha channel into all four channels of every mip.
pub fn replicate_alpha_channel(mips: &mut [Image]) {
    for mip in mips {
        for color in mip.colors_mut() {
            *color = LinearColor::new(color.a, color.a, color.a, color.a);
        }
    }
}

/// Alpha values above this quantize to 255 in U8 and count as opaque.
const FLOAT_NON_OPAQUE_ALPHA: f32 = 254.5 / 255.0;

/// Detects whether any texel carries meaningful alpha, per source format.
/// Formats without an alpha channel are always opaque.
pub fn detect_alpha_channel(image: &Image) -> bool {
    match image.format() {
        PixelFormat::Bgra8 => image
            .bytes()
            .chunks_exact(4)
            .any(|p| p[3] != 255),
        PixelFormat::Rgba16 => {
            let words: &[u16] = bytemuck::cast_slice(image.bytes());
            words.chunks_exact(4).any(|p| p[3] != 0xFFFF)
        }
        PixelFormat::Rgba32F => image
            .colors()
            .iter()
            .any(|c| c.a <= FLOAT_NON_OPAQUE_ALPHA),
        PixelFormat::Rgba16F => {
            let halves: &[u16] = bytemuck::cast_slice(image.bytes());
            halves
                .chunks_exact(4)
                .any(|p| half::f16::from_bits(p[3]).to_f32() <= FLOAT_NON_OPAQUE_ALPHA)
        }
        _ => false,
    }
}

/// Resolves the effective has-alpha flag from detection plus the force
/// overrides. Force-no-alpha wins over force-alpha.
pub fn resolve_has_alpha(image: &Image, settings: &BuildSettings) -> bool {
    if settings.force_no_alpha {
        false
    } else if settings.force_alpha {
        true
    } else {
        detect_alpha_channel(image)
    }
}
