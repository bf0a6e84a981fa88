//! Separable downsample kernel construction.
//!
//! Kernels are built as a 1D table and outer-producted into 2D. Size 2 is
//! the plain 2x2 box average and ignores the sharpen factor. A negative
//! sharpen factor selects a pure Gaussian blur with variance equal to the
//! magnitude; this path supports odd sizes, which keeps the filter centered
//! and is what the top-mip pass relies on to avoid a half-texel shift.
//! Sizes 4, 6 and 8 combine a fixed two-tap inner lobe of weight
//! `(1 + sharpen) / 2` with a box-blurred negative lobe of total weight
//! `-sharpen`; size 8 doubles the sharpen factor and blurs the positive
//! lobe once for quality.

use std::f32::consts::PI;

/// Largest supported kernel extent per axis.
pub const MAX_KERNEL_EXTEND: usize = 12;

/// A normalized 2D filter kernel; weights sum to 1.0.
#[derive(Debug, Clone)]
pub struct FilterKernel {
    size: usize,
    weights: Vec<f32>,
}

impl FilterKernel {
    /// Builds a kernel of the given 1D size.
    ///
    /// # Arguments
    ///
    /// * `size` - 2 for 2x2 box, 4/6/8 for sharpen kernels, any size in
    ///   (2, 12] when `sharpen` is negative (pure Gaussian)
    /// * `sharpen` - Sharpen factor; negative means blur with that variance
    ///
    /// # Panics
    ///
    /// Panics on a size outside the supported set. Kernel size comes from
    /// settings validated before mip generation starts, so an unsupported
    /// size here is a programming error.
    pub fn build(size: usize, sharpen: f32) -> Self {
        let size = size.min(MAX_KERNEL_EXTEND);

        if size == 2 {
            return Self {
                size: 2,
                weights: vec![0.25; 4],
            };
        }

        if sharpen < 0.0 {
            assert!(size > 2, "gaussian blur kernel requires size > 2");
            let table = build_gaussian_1d(size, 1.0, -sharpen);
            return Self {
                size,
                weights: outer_product(&table),
            };
        }

        let (positive_blurs, negative_blurs, sharpen) = match size {
            4 => (0, 1, sharpen),
            6 => (0, 2, sharpen),
            // doubled to match the size 6 appearance
            8 => (1, 3, sharpen * 2.0),
            other => panic!("unsupported kernel size {other}"),
        };

        let mut table = build_base_1d(size, 1.0 + sharpen);
        blur_table_1d(&mut table, positive_blurs);
        let mut negative = build_base_1d(size, -sharpen);
        blur_table_1d(&mut negative, negative_blurs);
        for (t, n) in table.iter_mut().zip(&negative) {
            *t += n;
        }

        Self {
            size,
            weights: outer_product(&table),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Weight at kernel coordinates.
    pub fn at(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.size && y < self.size);
        self.weights[y * self.size + x]
    }

    /// Sum of all 2D weights; 1.0 within floating-point tolerance.
    pub fn weight_sum(&self) -> f32 {
        self.weights.iter().sum()
    }
}

fn normal_distribution(x: f32, variance: f32) -> f32 {
    let std_dev = variance.sqrt();
    (-x * x / (2.0 * variance)).exp() / (std_dev * (2.0 * PI).sqrt())
}

/// Sampled Gaussian normalized to `sum`. Supports even and odd sizes.
fn build_gaussian_1d(size: usize, sum: f32, variance: f32) -> Vec<f32> {
    let center = size as f32 * 0.5 - 0.5;
    let mut table: Vec<f32> = (0..size)
        .map(|i| normal_distribution(i as f32 - center, variance))
        .collect();
    let current: f32 = table.iter().sum();
    let inv = sum / current;
    for w in &mut table {
        *w *= inv;
    }
    table
}

/// Two center taps carrying `sum / 2` each, zero elsewhere. Even sizes only.
fn build_base_1d(size: usize, sum: f32) -> Vec<f32> {
    debug_assert_eq!(size % 2, 0);
    let inner = 0.5 * sum;
    let center = size / 2;
    (0..size)
        .map(|x| if x == center || x == center - 1 { inner } else { 0.0 })
        .collect()
}

/// Repeated 3-tap box blur in place. One pass gives a box profile, two a
/// triangle, three approaches a Gaussian.
fn blur_table_1d(table: &mut [f32], times: usize) {
    let size = table.len();
    for _ in 0..times {
        let intermediate = table.to_vec();
        for x in 0..size {
            let mut sum = intermediate[x];
            if x > 0 {
                sum += intermediate[x - 1];
            }
            if x < size - 1 {
                sum += intermediate[x + 1];
            }
            table[x] = sum / 3.0;
        }
    }
}

fn outer_product(table: &[f32]) -> Vec<f32> {
    let size = table.len();
    let mut out = vec![0.0; size * size];
    for y in 0..size {
        for x in 0..size {
            out[y * size + x] = table[y] * table[x];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_kernel_weights() {
        let kernel = FilterKernel::build(2, 5.0);
        assert_eq!(kernel.size(), 2);
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(kernel.at(x, y), 0.25);
            }
        }
        assert!((kernel.weight_sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sharpen_kernels_normalized() {
        for size in [4, 6, 8] {
            for sharpen in [0.0, 1.0, 3.5] {
                let kernel = FilterKernel::build(size, sharpen);
                assert!(
                    (kernel.weight_sum() - 1.0).abs() < 1e-4,
                    "size {size} sharpen {sharpen} sums to {}",
                    kernel.weight_sum()
                );
            }
        }
    }

    #[test]
    fn test_gaussian_kernel_odd_size_centered() {
        let kernel = FilterKernel::build(9, -2.0);
        assert_eq!(kernel.size(), 9);
        assert!((kernel.weight_sum() - 1.0).abs() < 1e-4);
        // symmetric around the center tap
        assert!((kernel.at(0, 4) - kernel.at(8, 4)).abs() < 1e-6);
        assert!(kernel.at(4, 4) > kernel.at(3, 4));
    }

    #[test]
    fn test_sharpen_produces_negative_lobe() {
        let kernel = FilterKernel::build(8, 2.0);
        let has_negative = (0..8).any(|y| (0..8).any(|x| kernel.at(x, y) < 0.0));
        assert!(has_negative, "sharpen kernel should have a negative lobe");
    }

    #[test]
    #[should_panic(expected = "unsupported kernel size")]
    fn test_unsupported_size_panics() {
        let _ = FilterKernel::build(5, 1.0);
    }

    #[test]
    fn test_oversize_clamps_to_max() {
        let kernel = FilterKernel::build(20, -1.0);
        assert_eq!(kernel.size(), MAX_KERNEL_EXTEND);
    }
}
