//! Addressed read access to a single image slice.

use crate::color::{LinearColor, TRANSPARENT};
use serde::{Deserialize, Serialize};

/// How out-of-range coordinates are resolved when a filter kernel reads
/// past a slice edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AddressMode {
    /// Coordinates wrap around to the opposite edge.
    #[default]
    Wrap,
    /// Coordinates clamp to the nearest edge texel.
    Clamp,
    /// Reads outside the slice return transparent black.
    BorderBlack,
}

/// Read-only view over one slice of an RGBA32F image, applying an
/// [`AddressMode`] to out-of-range reads.
#[derive(Debug, Clone, Copy)]
pub struct SliceView<'a> {
    pixels: &'a [LinearColor],
    width: usize,
    height: usize,
    address_mode: AddressMode,
}

impl<'a> SliceView<'a> {
    pub fn new(
        pixels: &'a [LinearColor],
        width: usize,
        height: usize,
        address_mode: AddressMode,
    ) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            pixels,
            width,
            height,
            address_mode,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reads the texel at signed coordinates, applying the address mode.
    pub fn get(&self, x: i64, y: i64) -> LinearColor {
        let w = self.width as i64;
        let h = self.height as i64;
        let (x, y) = match self.address_mode {
            AddressMode::Wrap => (x.rem_euclid(w), y.rem_euclid(h)),
            AddressMode::Clamp => (x.clamp(0, w - 1), y.clamp(0, h - 1)),
            AddressMode::BorderBlack => {
                if x < 0 || x >= w || y < 0 || y >= h {
                    return TRANSPARENT;
                }
                (x, y)
            }
        };
        self.pixels[(y * w + x) as usize]
    }

    /// Reads an in-range texel without address resolution.
    pub fn get_unchecked(&self, x: usize, y: usize) -> LinearColor {
        self.pixels[y * self.width + x]
    }

    /// Bilinear sample at continuous pixel coordinates. Texel centers sit
    /// at integer coordinates.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> LinearColor {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let x0 = x0 as i64;
        let y0 = y0 as i64;
        let top = LinearColor::lerp(self.get(x0, y0), self.get(x0 + 1, y0), fx);
        let bottom = LinearColor::lerp(self.get(x0, y0 + 1), self.get(x0 + 1, y0 + 1), fx);
        LinearColor::lerp(top, bottom, fy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Vec<LinearColor> {
        vec![
            LinearColor::new(1.0, 0.0, 0.0, 1.0),
            LinearColor::new(0.0, 1.0, 0.0, 1.0),
            LinearColor::new(0.0, 0.0, 1.0, 1.0),
            LinearColor::new(1.0, 1.0, 1.0, 1.0),
        ]
    }

    #[test]
    fn test_wrap_addressing() {
        let pixels = checker();
        let view = SliceView::new(&pixels, 2, 2, AddressMode::Wrap);
        assert_eq!(view.get(-1, 0), view.get(1, 0));
        assert_eq!(view.get(2, 3), view.get(0, 1));
    }

    #[test]
    fn test_clamp_addressing() {
        let pixels = checker();
        let view = SliceView::new(&pixels, 2, 2, AddressMode::Clamp);
        assert_eq!(view.get(-5, -5), view.get(0, 0));
        assert_eq!(view.get(10, 10), view.get(1, 1));
    }

    #[test]
    fn test_border_black_addressing() {
        let pixels = checker();
        let view = SliceView::new(&pixels, 2, 2, AddressMode::BorderBlack);
        let outside = view.get(-1, 0);
        assert_eq!(outside.a, 0.0);
        assert_eq!(outside.r, 0.0);
        assert_eq!(view.get(0, 0).r, 1.0);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let pixels = vec![
            LinearColor::new(0.0, 0.0, 0.0, 1.0),
            LinearColor::new(1.0, 0.0, 0.0, 1.0),
        ];
        let view = SliceView::new(&pixels, 2, 1, AddressMode::Clamp);
        let mid = view.sample_bilinear(0.5, 0.0);
        assert!((mid.r - 0.5).abs() < 1e-6);
    }
}
