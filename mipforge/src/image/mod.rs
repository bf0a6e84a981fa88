//! Image buffers shared by the mip generator and the block encoders.
//!
//! An [`Image`] owns a tightly packed byte buffer for one or more 2D slices
//! of identical dimensions. Volume textures and cubemaps store their depth
//! slices / faces as consecutive slices in the same buffer. All filtering
//! math runs on the RGBA32F working format; [`convert`] moves source formats
//! in and out of it.

pub mod convert;
pub mod format;
pub mod view;

pub use format::{GammaSpace, PixelFormat};
pub use view::{AddressMode, SliceView};

use crate::color::LinearColor;
use crate::error::ValidationError;

/// A tightly packed pixel buffer with one or more equally sized slices.
#[derive(Debug, Clone)]
pub struct Image {
    data: Vec<u8>,
    width: usize,
    height: usize,
    num_slices: usize,
    format: PixelFormat,
    gamma: GammaSpace,
}

impl Image {
    /// Creates a zero-filled image.
    ///
    /// # Arguments
    ///
    /// * `width` - Slice width in pixels
    /// * `height` - Slice height in pixels
    /// * `num_slices` - Number of 2D slices (1 for plain textures, 6 for cubemaps)
    /// * `format` - Pixel layout of the buffer
    /// * `gamma` - Gamma encoding of the stored values
    pub fn new(
        width: usize,
        height: usize,
        num_slices: usize,
        format: PixelFormat,
        gamma: GammaSpace,
    ) -> Self {
        let len = width * height * num_slices * format.bytes_per_pixel();
        Self {
            data: vec![0u8; len],
            width,
            height,
            num_slices,
            format,
            gamma,
        }
    }

    /// Wraps an existing byte buffer, validating its length against the
    /// described dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BufferSizeMismatch`] if the buffer length
    /// does not equal `width * height * num_slices * bytes_per_pixel`.
    pub fn from_raw(
        data: Vec<u8>,
        width: usize,
        height: usize,
        num_slices: usize,
        format: PixelFormat,
        gamma: GammaSpace,
    ) -> Result<Self, ValidationError> {
        let expected = width * height * num_slices * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(ValidationError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            num_slices,
            format,
            gamma,
        })
    }

    /// Creates a zero-filled RGBA32F working image.
    pub fn new_rgba32f(width: usize, height: usize, num_slices: usize) -> Self {
        Self::new(width, height, num_slices, PixelFormat::Rgba32F, GammaSpace::Linear)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn num_slices(&self) -> usize {
        self.num_slices
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn gamma(&self) -> GammaSpace {
        self.gamma
    }

    /// Sets the gamma tag without touching pixel data.
    pub fn set_gamma(&mut self, gamma: GammaSpace) {
        self.gamma = gamma;
    }

    /// Pixels in a single slice.
    pub fn slice_pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Raw bytes of the whole buffer.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes of the whole buffer.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the image and returns its byte buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// All pixels as linear colors.
    ///
    /// # Panics
    ///
    /// Panics if the image is not in the RGBA32F working format.
    pub fn colors(&self) -> &[LinearColor] {
        assert_eq!(self.format, PixelFormat::Rgba32F);
        bytemuck::cast_slice(&self.data)
    }

    /// All pixels as mutable linear colors.
    ///
    /// # Panics
    ///
    /// Panics if the image is not in the RGBA32F working format.
    pub fn colors_mut(&mut self) -> &mut [LinearColor] {
        assert_eq!(self.format, PixelFormat::Rgba32F);
        bytemuck::cast_slice_mut(&mut self.data)
    }

    /// Pixels of one slice as linear colors.
    pub fn slice_colors(&self, slice: usize) -> &[LinearColor] {
        let n = self.slice_pixel_count();
        &self.colors()[slice * n..(slice + 1) * n]
    }

    /// Pixels of one slice as mutable linear colors.
    pub fn slice_colors_mut(&mut self, slice: usize) -> &mut [LinearColor] {
        let n = self.slice_pixel_count();
        let start = slice * n;
        &mut self.colors_mut()[start..start + n]
    }

    /// Read-only view over one slice with wrap/clamp addressing.
    pub fn slice_view(&self, slice: usize, address_mode: AddressMode) -> SliceView<'_> {
        SliceView::new(self.slice_colors(slice), self.width, self.height, address_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_zero_filled() {
        let img = Image::new_rgba32f(4, 2, 1);
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 2);
        assert_eq!(img.bytes().len(), 4 * 2 * 16);
        assert!(img.colors().iter().all(|c| c.r == 0.0 && c.a == 0.0));
    }

    #[test]
    fn test_from_raw_validates_length() {
        let err = Image::from_raw(vec![0u8; 10], 4, 4, 1, PixelFormat::Bgra8, GammaSpace::Srgb)
            .unwrap_err();
        match err {
            ValidationError::BufferSizeMismatch { expected, actual } => {
                assert_eq!(expected, 64);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_slice_colors_partition() {
        let mut img = Image::new_rgba32f(2, 2, 2);
        img.slice_colors_mut(1)[0].r = 1.0;
        assert_eq!(img.slice_colors(0)[0].r, 0.0);
        assert_eq!(img.slice_colors(1)[0].r, 1.0);
    }

    #[test]
    fn test_colors_roundtrip_through_bytes() {
        let mut img = Image::new_rgba32f(1, 1, 1);
        img.colors_mut()[0] = LinearColor::new(0.25, 0.5, 0.75, 1.0);
        let copy = Image::from_raw(
            img.bytes().to_vec(),
            1,
            1,
            1,
            PixelFormat::Rgba32F,
            GammaSpace::Linear,
        )
        .unwrap();
        assert_eq!(copy.colors()[0], LinearColor::new(0.25, 0.5, 0.75, 1.0));
    }
}
