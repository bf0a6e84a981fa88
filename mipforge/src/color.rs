//! Linear-space RGBA color used by all mip processing.
//!
//! Every filtering and adjustment pass in this crate operates on
//! [`LinearColor`] values: 32-bit float per channel, linear gamma. Source
//! pixel formats are converted up front (see [`crate::image`]) so the
//! signal-processing code never has to reason about encodings.

use bytemuck::{Pod, Zeroable};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

/// RGBA color in linear space, one `f32` per channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, serde::Serialize, serde::Deserialize)]
pub struct LinearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Transparent black, the border color and accumulator zero.
pub const TRANSPARENT: LinearColor = LinearColor {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 0.0,
};

impl LinearColor {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Access a channel by index (0=R, 1=G, 2=B, 3=A).
    ///
    /// # Panics
    ///
    /// Panics if `index > 3`.
    pub fn component(&self, index: usize) -> f32 {
        match index {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            3 => self.a,
            _ => panic!("color component index out of range: {}", index),
        }
    }

    /// Mutable access to a channel by index (0=R, 1=G, 2=B, 3=A).
    pub fn component_mut(&mut self, index: usize) -> &mut f32 {
        match index {
            0 => &mut self.r,
            1 => &mut self.g,
            2 => &mut self.b,
            3 => &mut self.a,
            _ => panic!("color component index out of range: {}", index),
        }
    }

    /// Relative luminance with the 0.3/0.59/0.11 weighting used by the
    /// sharpen-without-color-shift filter.
    pub fn luminance(&self) -> f32 {
        self.r * 0.3 + self.g * 0.59 + self.b * 0.11
    }

    /// Linear interpolation between two colors.
    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        a + (b - a) * t
    }

    /// Convert to hue/saturation/value. Returns (H in degrees, S, V) with
    /// alpha carried through unchanged in the fourth slot.
    pub fn to_hsv(&self) -> Self {
        let rgb_max = self.r.max(self.g).max(self.b);
        let rgb_min = self.r.min(self.g).min(self.b);
        let range = rgb_max - rgb_min;

        let hue = if rgb_max == rgb_min {
            0.0
        } else if rgb_max == self.r {
            (((self.g - self.b) / range) * 60.0 + 360.0) % 360.0
        } else if rgb_max == self.g {
            ((self.b - self.r) / range) * 60.0 + 120.0
        } else {
            ((self.r - self.g) / range) * 60.0 + 240.0
        };

        let saturation = if rgb_max == 0.0 { 0.0 } else { range / rgb_max };

        Self::new(hue, saturation, rgb_max, self.a)
    }

    /// Convert back from hue/saturation/value produced by [`Self::to_hsv`].
    /// Hue must be non-negative.
    pub fn from_hsv(hsv: Self) -> Self {
        let (hue, saturation, value) = (hsv.r, hsv.g, hsv.b);

        let h_div_60 = hue / 60.0;
        let h_floor = h_div_60.floor();
        let fraction = h_div_60 - h_floor;

        let values = [
            value,
            value * (1.0 - saturation),
            value * (1.0 - fraction * saturation),
            value * (1.0 - (1.0 - fraction) * saturation),
        ];

        const SWIZZLE: [[usize; 3]; 6] = [
            [0, 3, 1],
            [2, 0, 1],
            [1, 0, 3],
            [1, 2, 0],
            [3, 1, 0],
            [0, 1, 2],
        ];
        let index = (h_floor as usize) % 6;

        Self::new(
            values[SWIZZLE[index][0]],
            values[SWIZZLE[index][1]],
            values[SWIZZLE[index][2]],
            hsv.a,
        )
    }

    /// True if every channel is within `tolerance` of the other color.
    pub fn nearly_equals(&self, other: &Self, tolerance: f32) -> bool {
        (self.r - other.r).abs() <= tolerance
            && (self.g - other.g).abs() <= tolerance
            && (self.b - other.b).abs() <= tolerance
            && (self.a - other.a).abs() <= tolerance
    }
}

impl Add for LinearColor {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.r + rhs.r,
            self.g + rhs.g,
            self.b + rhs.b,
            self.a + rhs.a,
        )
    }
}

impl Sub for LinearColor {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.r - rhs.r,
            self.g - rhs.g,
            self.b - rhs.b,
            self.a - rhs.a,
        )
    }
}

impl Mul<f32> for LinearColor {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

impl Div<f32> for LinearColor {
    type Output = Self;
    fn div(self, rhs: f32) -> Self {
        let inv = 1.0 / rhs;
        self * inv
    }
}

impl AddAssign for LinearColor {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl MulAssign<f32> for LinearColor {
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_access() {
        let c = LinearColor::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(c.component(0), 0.1);
        assert_eq!(c.component(1), 0.2);
        assert_eq!(c.component(2), 0.3);
        assert_eq!(c.component(3), 0.4);
    }

    #[test]
    #[should_panic]
    fn test_component_out_of_range_panics() {
        let c = LinearColor::default();
        c.component(4);
    }

    #[test]
    fn test_luminance_weights_sum_to_one() {
        let white = LinearColor::new(1.0, 1.0, 1.0, 1.0);
        assert!((white.luminance() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = LinearColor::new(0.0, 0.0, 0.0, 0.0);
        let b = LinearColor::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(LinearColor::lerp(a, b, 0.0), a);
        assert_eq!(LinearColor::lerp(a, b, 1.0), b);

        let mid = LinearColor::lerp(a, b, 0.5);
        assert!((mid.g - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hsv_roundtrip_primaries() {
        for c in [
            LinearColor::new(1.0, 0.0, 0.0, 1.0),
            LinearColor::new(0.0, 1.0, 0.0, 0.5),
            LinearColor::new(0.0, 0.0, 1.0, 0.0),
            LinearColor::new(0.25, 0.5, 0.75, 1.0),
        ] {
            let back = LinearColor::from_hsv(c.to_hsv());
            assert!(
                back.nearly_equals(&c, 1e-5),
                "HSV roundtrip drifted: {:?} -> {:?}",
                c,
                back
            );
        }
    }

    #[test]
    fn test_hsv_of_gray_has_zero_saturation() {
        let gray = LinearColor::new(0.5, 0.5, 0.5, 1.0);
        let hsv = gray.to_hsv();
        assert_eq!(hsv.r, 0.0); // hue
        assert_eq!(hsv.g, 0.0); // saturation
        assert_eq!(hsv.b, 0.5); // value
    }

    #[test]
    fn test_arithmetic() {
        let a = LinearColor::new(1.0, 2.0, 3.0, 4.0);
        let b = LinearColor::new(0.5, 0.5, 0.5, 0.5);
        assert_eq!(a + b, LinearColor::new(1.5, 2.5, 3.5, 4.5));
        assert_eq!(a - b, LinearColor::new(0.5, 1.5, 2.5, 3.5));
        assert_eq!(a * 2.0, LinearColor::new(2.0, 4.0, 6.0, 8.0));
    }
}
