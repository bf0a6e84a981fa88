//! Alpha-coverage preservation.
//!
//! Coverage is the fraction of texels whose channel value passes a
//! threshold. Scaling channels before downsampling keeps that fraction
//! stable across mip levels, which matters for alpha-tested foliage and
//! similar content where plain averaging erodes coverage.

use crate::image::view::SliceView;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Tolerance used both for the solver's early-out and its per-channel
/// convergence check.
pub const COVERAGE_EPSILON: f32 = 1e-4;

const SOLVER_ITERATIONS: usize = 8;

/// Finds the smallest float `t` such that `x * scale >= threshold` is
/// exactly equivalent to `x >= t` in round-to-nearest arithmetic.
///
/// The coverage test was originally written in the first form; evaluating
/// it in the second form must not flip any edge-case texel, and a naive
/// `threshold / scale` can round in either direction. The quotient is
/// nudged by one ULP whichever way restores the equivalence.
///
/// # Panics
///
/// Panics if `threshold` or `scale` is not positive.
pub fn determine_scaled_threshold(threshold: f32, scale: f32) -> f32 {
    assert!(threshold > 0.0 && scale > 0.0);

    let mut scaled = threshold / scale;
    let stepped_down = scaled.next_down();

    if stepped_down * scale >= threshold {
        scaled = stepped_down;
    } else if scaled * scale < threshold {
        scaled = scaled.next_up();
    }

    debug_assert!(scaled * scale >= threshold);
    debug_assert!(scaled.next_down() * scale < threshold);
    scaled
}

fn count_rows<F>(height: usize, parallel: bool, count_row: F) -> u64
where
    F: Fn(usize) -> u64 + Sync,
{
    if parallel {
        let total = AtomicU64::new(0);
        (0..height).into_par_iter().for_each(|y| {
            total.fetch_add(count_row(y), Ordering::Relaxed);
        });
        total.into_inner()
    } else {
        (0..height).map(count_row).sum()
    }
}

/// Measures per-channel coverage of `src` under the given thresholds,
/// as if each channel were first multiplied by its scale.
///
/// Channels with a zero threshold report zero coverage. When only the
/// alpha channel is enabled, a single-channel scan is used.
pub fn compute_alpha_coverage(
    thresholds: [f32; 4],
    scales: [f32; 4],
    src: &SliceView<'_>,
    parallel: bool,
) -> [f32; 4] {
    let mut coverage = [0.0f32; 4];
    let pixel_count = (src.width() * src.height()) as f32;

    if thresholds[0] == 0.0 && thresholds[1] == 0.0 && thresholds[2] == 0.0 {
        // common case, only alpha carries a coverage goal
        debug_assert!(thresholds[3] != 0.0);
        let scaled = determine_scaled_threshold(thresholds[3], scales[3]);

        let passed = count_rows(src.height(), parallel, |y| {
            let mut local = 0u64;
            for x in 0..src.width() {
                local += (src.get_unchecked(x, y).a >= scaled) as u64;
            }
            local
        });
        coverage[3] = passed as f32 / pixel_count;
    } else {
        let mut scaled = [f32::MAX; 4];
        for i in 0..4 {
            if thresholds[i] != 0.0 {
                scaled[i] = determine_scaled_threshold(thresholds[i], scales[i]);
            }
        }

        let counters: [AtomicU64; 4] = Default::default();
        let scan_row = |y: usize| {
            let mut local = [0u64; 4];
            for x in 0..src.width() {
                let pixel = src.get_unchecked(x, y);
                for i in 0..4 {
                    local[i] += (pixel.component(i) >= scaled[i]) as u64;
                }
            }
            for i in 0..4 {
                counters[i].fetch_add(local[i], Ordering::Relaxed);
            }
        };
        if parallel {
            (0..src.height()).into_par_iter().for_each(scan_row);
        } else {
            (0..src.height()).for_each(scan_row);
        }
        for i in 0..4 {
            coverage[i] = counters[i].load(Ordering::Relaxed) as f32 / pixel_count;
        }
    }

    trace!(?thresholds, ?coverage, "alpha coverage measured");
    coverage
}

/// Solves for per-channel scales whose measured coverage matches the
/// goals, via 8 iterations of bisection in [0, 4].
///
/// The returned value is the last computed midpoint, which the final
/// iteration has not re-measured. That can land farther from the goal
/// than an earlier guess; existing output depends on this exact
/// sequence, so it stays.
pub fn compute_alpha_scale(
    coverage_goals: [f32; 4],
    thresholds: [f32; 4],
    src: &SliceView<'_>,
    parallel: bool,
) -> [f32; 4] {
    let mut min_scales = [0.0f32; 4];
    let mut max_scales = [4.0f32; 4];
    let mut scales = [1.0f32; 4];

    for _ in 0..SOLVER_ITERATIONS {
        let computed = compute_alpha_coverage(thresholds, scales, src, parallel);
        trace!(?scales, ?computed, ?coverage_goals, "alpha scale bisection step");

        for j in 0..4 {
            if thresholds[j] == 0.0 || (computed[j] - coverage_goals[j]).abs() < COVERAGE_EPSILON {
                continue;
            }
            if computed[j] < coverage_goals[j] {
                min_scales[j] = scales[j];
            } else {
                max_scales[j] = scales[j];
            }
            scales[j] = (min_scales[j] + max_scales[j]) * 0.5;
        }

        let converged = (0..4)
            .all(|j| (computed[j] - coverage_goals[j]).abs() < COVERAGE_EPSILON);
        if converged {
            break;
        }
    }

    scales
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::LinearColor;
    use crate::image::view::AddressMode;
    use crate::image::Image;

    #[test]
    fn test_scaled_threshold_equivalence() {
        for &(threshold, scale) in &[(0.5f32, 1.3f32), (0.333, 0.7), (0.9, 2.0), (0.1, 3.9)] {
            let scaled = determine_scaled_threshold(threshold, scale);
            assert!(scaled * scale >= threshold);
            assert!(scaled.next_down() * scale < threshold);
        }
    }

    fn half_covered_image() -> Image {
        // exactly half the texels have alpha above 0.5
        let mut img = Image::new_rgba32f(8, 8, 1);
        for (i, c) in img.colors_mut().iter_mut().enumerate() {
            c.a = if i < 32 { 0.9 } else { 0.1 };
        }
        img
    }

    #[test]
    fn test_coverage_fifty_percent() {
        let img = half_covered_image();
        let view = img.slice_view(0, AddressMode::Wrap);
        let coverage =
            compute_alpha_coverage([0.0, 0.0, 0.0, 0.5], [1.0; 4], &view, false);
        assert!((coverage[3] - 0.5).abs() < 1e-6);
        assert_eq!(coverage[0], 0.0);
    }

    #[test]
    fn test_coverage_parallel_matches_serial() {
        let img = half_covered_image();
        let view = img.slice_view(0, AddressMode::Wrap);
        let thresholds = [0.0, 0.0, 0.0, 0.5];
        let serial = compute_alpha_coverage(thresholds, [1.0; 4], &view, false);
        let parallel = compute_alpha_coverage(thresholds, [1.0; 4], &view, true);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_multi_channel_coverage() {
        let mut img = Image::new_rgba32f(4, 4, 1);
        for c in img.colors_mut() {
            *c = LinearColor::new(0.8, 0.2, 0.0, 1.0);
        }
        let view = img.slice_view(0, AddressMode::Wrap);
        let coverage =
            compute_alpha_coverage([0.5, 0.5, 0.0, 0.5], [1.0; 4], &view, false);
        assert_eq!(coverage[0], 1.0);
        assert_eq!(coverage[1], 0.0);
        assert_eq!(coverage[2], 0.0);
        assert_eq!(coverage[3], 1.0);
    }

    #[test]
    fn test_solver_hits_goal_coverage() {
        let img = half_covered_image();
        let view = img.slice_view(0, AddressMode::Wrap);
        let thresholds = [0.0, 0.0, 0.0, 0.5];
        let goals = [0.0, 0.0, 0.0, 0.5];
        let scales = compute_alpha_scale(goals, thresholds, &view, false);
        let measured = compute_alpha_coverage(thresholds, scales, &view, false);
        assert!(
            (measured[3] - 0.5).abs() < COVERAGE_EPSILON,
            "measured coverage {} not within epsilon of goal",
            measured[3]
        );
    }

    #[test]
    fn test_solver_converged_input_returns_unit_scale() {
        let img = half_covered_image();
        let view = img.slice_view(0, AddressMode::Wrap);
        let thresholds = [0.0, 0.0, 0.0, 0.5];
        // goal equals the measured coverage of an unscaled image
        let goals = compute_alpha_coverage(thresholds, [1.0; 4], &view, false);
        let scales = compute_alpha_scale(goals, thresholds, &view, false);
        assert_eq!(scales[3], 1.0);
    }
}
