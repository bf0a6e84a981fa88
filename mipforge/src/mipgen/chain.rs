//! Mip chain generation.
//!
//! The chain walks from the top mip down to 1x1, halving per level. Two
//! kernels are in play: the configured downsample kernel produces the
//! emitted mips, and when `downsample_with_average` is set a plain box
//! kernel produces the next iteration's source separately, so sharpening
//! does not compound across levels.

use crate::image::{Image, PixelFormat};
use crate::mipgen::alpha::{compute_alpha_coverage, compute_alpha_scale};
use crate::mipgen::kernel::FilterKernel;
use crate::mipgen::resample::{downsample, downsample_volume, regenerate_border, DownsampleOptions};
use crate::settings::{BuildSettings, MipFilter};
use tracing::{debug, warn};

fn next_dim(dim: usize) -> usize {
    (dim >> 1).max(1)
}

/// Number of mip levels from `width` x `height` down to 1x1 inclusive.
pub fn mip_count(width: usize, height: usize) -> usize {
    let mut count = 1;
    let (mut w, mut h) = (width, height);
    while w > 1 || h > 1 {
        w = next_dim(w);
        h = next_dim(h);
        count += 1;
    }
    count
}

/// Generates up to `depth_limit` mips below `base`, appending each to
/// `out`. The base image itself is not appended. Stops at 1x1 (and depth
/// 1 for volumes) or when the limit runs out.
///
/// # Panics
///
/// Panics if `base` is not linear RGBA32F; callers convert first.
pub fn generate_mip_chain(
    settings: &BuildSettings,
    base: &Image,
    out: &mut Vec<Image>,
    depth_limit: u32,
) {
    assert_eq!(base.format(), PixelFormat::Rgba32F);

    let parallel = settings.allow_parallel;
    let box_kernel = FilterKernel::build(2, 0.0);
    let sharpen_kernel = FilterKernel::build(settings.kernel_size as usize, settings.sharpen);
    let unfiltered = settings.mip_filter == MipFilter::Unfiltered;
    let redraw_border = settings.preserve_border
        && settings.address_mode != crate::image::AddressMode::BorderBlack;

    // coverage goals are measured once, on the top mip
    let coverage_enabled = settings.alpha_coverage_enabled();
    let coverage_goals = if coverage_enabled {
        let view = base.slice_view(0, settings.address_mode);
        compute_alpha_coverage(
            settings.alpha_coverage_thresholds,
            [1.0; 4],
            &view,
            parallel,
        )
    } else {
        [0.0; 4]
    };

    let mut intermediate: Option<Image> = None;
    let mut remaining = depth_limit;

    while remaining > 0 {
        remaining -= 1;
        let src = intermediate.as_ref().unwrap_or(base);
        let dst_w = next_dim(src.width());
        let dst_h = next_dim(src.height());
        let dst_slices = if settings.is_volume() {
            next_dim(src.num_slices())
        } else {
            src.num_slices()
        };

        let mut dest = Image::new_rgba32f(dst_w, dst_h, dst_slices);
        let mut next_src = settings
            .downsample_with_average
            .then(|| Image::new_rgba32f(dst_w, dst_h, dst_slices));

        for slice in 0..dst_slices {
            let src_slice = if settings.is_volume() { slice * 2 } else { slice };
            let view = src.slice_view(src_slice, settings.address_mode);
            let view_b;
            let second = if settings.is_volume() && src_slice + 1 < src.num_slices() {
                view_b = src.slice_view(src_slice + 1, settings.address_mode);
                Some(&view_b)
            } else {
                None
            };

            let alpha_scale = if coverage_enabled {
                compute_alpha_scale(
                    coverage_goals,
                    settings.alpha_coverage_thresholds,
                    &view,
                    parallel,
                )
            } else {
                [1.0; 4]
            };

            let mut options = DownsampleOptions::new(&sharpen_kernel, settings.address_mode);
            options.sharpen_without_color_shift = settings.sharpen_without_color_shift;
            options.unfiltered = unfiltered;
            options.alpha_scale = alpha_scale;
            options.parallel = parallel;
            downsample_volume(&view, second, dest.slice_colors_mut(slice), dst_w, dst_h, &options);

            if let Some(next) = next_src.as_mut() {
                let mut avg_options = options;
                avg_options.kernel = &box_kernel;
                downsample_volume(
                    &view,
                    second,
                    next.slice_colors_mut(slice),
                    dst_w,
                    dst_h,
                    &avg_options,
                );
            }
        }

        if redraw_border {
            for slice in 0..dst_slices {
                let src_slice = if settings.is_volume() { slice * 2 } else { slice };
                let view = src.slice_view(src_slice, settings.address_mode);
                regenerate_border(&view, dest.slice_colors_mut(slice), dst_w, dst_h);
                if let Some(next) = next_src.as_mut() {
                    regenerate_border(&view, next.slice_colors_mut(slice), dst_w, dst_h);
                }
            }
        }

        let terminal =
            dst_w == 1 && dst_h == 1 && (!settings.is_volume() || dst_slices == 1);

        intermediate = Some(match next_src {
            Some(next) => {
                out.push(dest);
                next
            }
            None => {
                out.push(dest.clone());
                dest
            }
        });

        if terminal {
            break;
        }
    }

    debug!(
        levels = out.len(),
        base_width = base.width(),
        base_height = base.height(),
        "generated mip chain"
    );
}

/// Filters the top mip in place at full resolution.
///
/// A negative sharpen factor selects a centered odd Gaussian so the image
/// does not shift. Non-Gaussian kernels are even and cause a half-texel
/// shift; that is honored but logged.
pub fn generate_top_mip(src: &Image, settings: &BuildSettings) -> Image {
    let kernel = if settings.sharpen < 0.0 {
        let odd_size = (settings.kernel_size as usize) | 1;
        FilterKernel::build(odd_size, settings.sharpen)
    } else {
        warn!("top mip filtered with an even kernel causes a half texel shift");
        FilterKernel::build(settings.kernel_size as usize, settings.sharpen)
    };

    let mut dest = Image::new_rgba32f(src.width(), src.height(), src.num_slices());
    for slice in 0..src.num_slices() {
        let view = src.slice_view(slice, settings.address_mode);
        let mut options = DownsampleOptions::new(&kernel, settings.address_mode);
        options.scale_factor = 1;
        options.sharpen_without_color_shift = settings.sharpen_without_color_shift;
        options.unfiltered = settings.mip_filter == MipFilter::Unfiltered;
        options.parallel = settings.allow_parallel;
        downsample(
            &view,
            dest.slice_colors_mut(slice),
            src.width(),
            src.height(),
            &options,
        );
    }
    dest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::LinearColor;

    fn uniform(width: usize, height: usize, slices: usize, color: LinearColor) -> Image {
        let mut img = Image::new_rgba32f(width, height, slices);
        img.colors_mut().fill(color);
        img
    }

    #[test]
    fn test_mip_count() {
        assert_eq!(mip_count(1, 1), 1);
        assert_eq!(mip_count(256, 256), 9);
        assert_eq!(mip_count(256, 1), 9);
        assert_eq!(mip_count(640, 480), 10);
    }

    #[test]
    fn test_chain_dimensions_halve_to_one() {
        let base = uniform(16, 8, 1, LinearColor::new(0.5, 0.5, 0.5, 1.0));
        let mut chain = Vec::new();
        generate_mip_chain(&BuildSettings::default(), &base, &mut chain, u32::MAX);
        let expected = [(8, 4), (4, 2), (2, 1), (1, 1)];
        assert_eq!(chain.len(), expected.len());
        for (mip, &(w, h)) in chain.iter().zip(&expected) {
            assert_eq!((mip.width(), mip.height()), (w, h));
        }
    }

    #[test]
    fn test_uniform_color_preserved_through_chain() {
        let color = LinearColor::new(0.25, 0.5, 0.75, 1.0);
        let base = uniform(32, 32, 1, color);
        let mut chain = Vec::new();
        let settings = BuildSettings::default().with_parallelism(false);
        generate_mip_chain(&settings, &base, &mut chain, u32::MAX);
        for (level, mip) in chain.iter().enumerate() {
            for c in mip.colors() {
                assert!(c.nearly_equals(&color, 1e-5), "level {level} drifted");
            }
        }
    }

    #[test]
    fn test_depth_limit_stops_early() {
        let base = uniform(64, 64, 1, LinearColor::new(0.1, 0.2, 0.3, 1.0));
        let mut chain = Vec::new();
        generate_mip_chain(&BuildSettings::default(), &base, &mut chain, 2);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].width(), 16);
    }

    #[test]
    fn test_volume_slices_halve() {
        use crate::settings::TextureKind;
        let base = uniform(8, 8, 4, LinearColor::new(0.5, 0.5, 0.5, 1.0));
        let settings = BuildSettings::default().with_kind(TextureKind::Volume);
        let mut chain = Vec::new();
        generate_mip_chain(&settings, &base, &mut chain, u32::MAX);
        assert_eq!(chain[0].num_slices(), 2);
        assert_eq!(chain[1].num_slices(), 1);
        let last = chain.last().unwrap();
        assert_eq!((last.width(), last.height(), last.num_slices()), (1, 1, 1));
    }

    #[test]
    fn test_array_slices_preserved() {
        let base = uniform(8, 8, 3, LinearColor::new(0.5, 0.5, 0.5, 1.0));
        let mut chain = Vec::new();
        generate_mip_chain(&BuildSettings::default(), &base, &mut chain, u32::MAX);
        for mip in &chain {
            assert_eq!(mip.num_slices(), 3);
        }
    }

    #[test]
    fn test_top_mip_gaussian_keeps_size() {
        let base = uniform(16, 16, 1, LinearColor::new(0.4, 0.4, 0.4, 1.0));
        let settings = BuildSettings::default().with_kernel(8, -1.0);
        let top = generate_top_mip(&base, &settings);
        assert_eq!((top.width(), top.height()), (16, 16));
        assert!(top.colors()[8 * 16 + 8].nearly_equals(&base.colors()[0], 1e-4));
    }
}
