//! Conversion between source pixel formats and the RGBA32F working format.
//!
//! Decoding always lands in linear RGBA32F. Gamma decoding applies to the
//! RGB channels of 8-bit color data only; alpha is always linear.

use crate::color::LinearColor;
use crate::image::{GammaSpace, Image, PixelFormat};
use half::f16;

/// Decodes one sRGB-encoded channel to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Encodes one linear channel to sRGB.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn decode_gamma(c: f32, gamma: GammaSpace) -> f32 {
    match gamma {
        GammaSpace::Linear => c,
        GammaSpace::Srgb => srgb_to_linear(c),
        GammaSpace::Pow22 => c.powf(2.2),
    }
}

fn encode_gamma(c: f32, gamma: GammaSpace) -> f32 {
    match gamma {
        GammaSpace::Linear => c,
        GammaSpace::Srgb => linear_to_srgb(c),
        GammaSpace::Pow22 => c.powf(1.0 / 2.2),
    }
}

/// Decodes an image of any supported source format into linear RGBA32F.
///
/// Single-channel gray formats replicate into RGB with opaque alpha; R16F
/// lands in the red channel only. Shared-exponent BGRE8 decodes with scale
/// `2^(e - 136)` and opaque alpha.
pub fn to_rgba32f(src: &Image) -> Image {
    let mut out = Image::new_rgba32f(src.width(), src.height(), src.num_slices());
    let gamma = src.gamma();
    let pixel_count = src.width() * src.height() * src.num_slices();
    let bytes = src.bytes();
    let colors = out.colors_mut();

    match src.format() {
        PixelFormat::Rgba32F => {
            colors.copy_from_slice(bytemuck::cast_slice(bytes));
        }
        PixelFormat::G8 => {
            for (i, color) in colors.iter_mut().enumerate() {
                let v = bytes[i] as f32 / 255.0;
                *color = LinearColor::new(v, v, v, 1.0);
            }
        }
        PixelFormat::Bgra8 => {
            for (i, color) in colors.iter_mut().enumerate() {
                let p = &bytes[i * 4..i * 4 + 4];
                *color = LinearColor::new(
                    decode_gamma(p[2] as f32 / 255.0, gamma),
                    decode_gamma(p[1] as f32 / 255.0, gamma),
                    decode_gamma(p[0] as f32 / 255.0, gamma),
                    p[3] as f32 / 255.0,
                );
            }
        }
        PixelFormat::Bgre8 => {
            for (i, color) in colors.iter_mut().enumerate() {
                let p = &bytes[i * 4..i * 4 + 4];
                let scale = (p[3] as f32 - 136.0).exp2();
                *color = LinearColor::new(
                    p[2] as f32 * scale,
                    p[1] as f32 * scale,
                    p[0] as f32 * scale,
                    1.0,
                );
            }
        }
        PixelFormat::Rgba16 => {
            let words: &[u16] = bytemuck::cast_slice(bytes);
            for (i, color) in colors.iter_mut().enumerate() {
                let p = &words[i * 4..i * 4 + 4];
                *color = LinearColor::new(
                    p[0] as f32 / 65535.0,
                    p[1] as f32 / 65535.0,
                    p[2] as f32 / 65535.0,
                    p[3] as f32 / 65535.0,
                );
            }
        }
        PixelFormat::Rgba16F => {
            let halves: &[u16] = bytemuck::cast_slice(bytes);
            for (i, color) in colors.iter_mut().enumerate() {
                let p = &halves[i * 4..i * 4 + 4];
                *color = LinearColor::new(
                    f16::from_bits(p[0]).to_f32(),
                    f16::from_bits(p[1]).to_f32(),
                    f16::from_bits(p[2]).to_f32(),
                    f16::from_bits(p[3]).to_f32(),
                );
            }
        }
        PixelFormat::G16 => {
            let words: &[u16] = bytemuck::cast_slice(bytes);
            for (i, color) in colors.iter_mut().enumerate() {
                let v = words[i] as f32 / 65535.0;
                *color = LinearColor::new(v, v, v, 1.0);
            }
        }
        PixelFormat::R16F => {
            let halves: &[u16] = bytemuck::cast_slice(bytes);
            for (i, color) in colors.iter_mut().enumerate() {
                let v = f16::from_bits(halves[i]).to_f32();
                *color = LinearColor::new(v, 0.0, 0.0, 1.0);
            }
        }
    }

    debug_assert_eq!(out.colors().len(), pixel_count);
    out
}

fn quantize_u8(c: f32) -> u8 {
    (c * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

/// Encodes a linear RGBA32F image into BGRA8 with the requested gamma
/// applied to the RGB channels.
///
/// # Panics
///
/// Panics if `src` is not RGBA32F.
pub fn to_bgra8(src: &Image, gamma: GammaSpace) -> Image {
    let mut out = Image::new(
        src.width(),
        src.height(),
        src.num_slices(),
        PixelFormat::Bgra8,
        gamma,
    );
    let colors = src.colors();
    for (color, p) in colors.iter().zip(out.bytes_mut().chunks_exact_mut(4)) {
        p[0] = quantize_u8(encode_gamma(color.b, gamma));
        p[1] = quantize_u8(encode_gamma(color.g, gamma));
        p[2] = quantize_u8(encode_gamma(color.r, gamma));
        p[3] = quantize_u8(color.a);
    }
    out
}

/// Encodes a linear RGBA32F image into half-float RGBA16F.
///
/// # Panics
///
/// Panics if `src` is not RGBA32F.
pub fn to_rgba16f(src: &Image) -> Image {
    let mut out = Image::new(
        src.width(),
        src.height(),
        src.num_slices(),
        PixelFormat::Rgba16F,
        GammaSpace::Linear,
    );
    let colors = src.colors();
    {
        let halves: &mut [u16] = bytemuck::cast_slice_mut(out.bytes_mut());
        for (color, p) in colors.iter().zip(halves.chunks_exact_mut(4)) {
            p[0] = f16::from_f32(color.r).to_bits();
            p[1] = f16::from_f32(color.g).to_bits();
            p[2] = f16::from_f32(color.b).to_bits();
            p[3] = f16::from_f32(color.a).to_bits();
        }
    }
    out
}
