//! Source pixel format and gamma tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Uncompressed pixel layout of an [`crate::image::Image`] buffer.
///
/// These are the source/working formats the pipeline accepts; compressed
/// block formats live in [`crate::encode::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit single channel (gray).
    G8,
    /// 8-bit per channel, B/G/R/A byte order.
    Bgra8,
    /// 8-bit shared-exponent HDR (B/G/R mantissas + exponent byte).
    Bgre8,
    /// 16-bit unsigned integer per channel RGBA.
    Rgba16,
    /// 16-bit float per channel RGBA.
    Rgba16F,
    /// 32-bit float per channel RGBA. The working format for all mip math.
    Rgba32F,
    /// 16-bit unsigned integer single channel.
    G16,
    /// 16-bit float single channel.
    R16F,
}

impl PixelFormat {
    /// Bytes per pixel for this layout.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::G8 => 1,
            PixelFormat::Bgra8 => 4,
            PixelFormat::Bgre8 => 4,
            PixelFormat::Rgba16 => 8,
            PixelFormat::Rgba16F => 8,
            PixelFormat::Rgba32F => 16,
            PixelFormat::G16 => 2,
            PixelFormat::R16F => 2,
        }
    }

    /// True if the layout carries an alpha channel at all. Formats without
    /// one are always treated as opaque by alpha detection.
    pub const fn has_alpha_channel(self) -> bool {
        matches!(
            self,
            PixelFormat::Bgra8 | PixelFormat::Rgba16 | PixelFormat::Rgba16F | PixelFormat::Rgba32F
        )
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::G8 => "G8",
            PixelFormat::Bgra8 => "BGRA8",
            PixelFormat::Bgre8 => "BGRE8",
            PixelFormat::Rgba16 => "RGBA16",
            PixelFormat::Rgba16F => "RGBA16F",
            PixelFormat::Rgba32F => "RGBA32F",
            PixelFormat::G16 => "G16",
            PixelFormat::R16F => "R16F",
        };
        write!(f, "{}", name)
    }
}

/// Gamma encoding of the stored bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GammaSpace {
    /// No transfer function; values are already linear.
    #[default]
    Linear,
    /// Standard sRGB piecewise curve.
    Srgb,
    /// Legacy pow-2.2 curve kept for old content.
    Pow22,
}
