//! Downsampling of individual image slices.
//!
//! All filtering runs on linear RGBA32F rows, parallelized per destination
//! row with rayon when the caller allows it. The common 2x2 box case takes
//! a fast path that skips edge addressing for interior pixels.

use crate::color::LinearColor;
use crate::image::view::{AddressMode, SliceView};
use crate::image::{GammaSpace, Image, PixelFormat};
use crate::mipgen::kernel::FilterKernel;
use rayon::prelude::*;

/// Per-call parameters for [`downsample`].
#[derive(Debug, Clone, Copy)]
pub struct DownsampleOptions<'a> {
    pub kernel: &'a FilterKernel,
    /// Source texels per destination texel along each axis, usually 2.
    pub scale_factor: usize,
    pub address_mode: AddressMode,
    /// Rescale only luminance to the sharpened value, keeping box-filtered
    /// chrominance; sharpened alpha passes through.
    pub sharpen_without_color_shift: bool,
    /// Nearest-sample copy, no filtering.
    pub unfiltered: bool,
    /// Per-channel multiplier applied after filtering (alpha-coverage
    /// preservation); `[1.0; 4]` is a no-op.
    pub alpha_scale: [f32; 4],
    /// Fan destination rows out onto the rayon pool.
    pub parallel: bool,
}

impl<'a> DownsampleOptions<'a> {
    /// Plain box/kernel downsample with no extras.
    pub fn new(kernel: &'a FilterKernel, address_mode: AddressMode) -> Self {
        Self {
            kernel,
            scale_factor: 2,
            address_mode,
            sharpen_without_color_shift: false,
            unfiltered: false,
            alpha_scale: [1.0; 4],
            parallel: true,
        }
    }

    fn alpha_scale_active(&self) -> bool {
        self.alpha_scale != [1.0; 4]
    }
}

fn for_each_row<F>(dst: &mut [LinearColor], width: usize, parallel: bool, f: F)
where
    F: Fn(usize, &mut [LinearColor]) + Sync + Send,
{
    if parallel {
        dst.par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    } else {
        for (y, row) in dst.chunks_mut(width).enumerate() {
            f(y, row);
        }
    }
}

/// 2x2 box average fast path. Source is exactly twice the destination in
/// both axes so no edge addressing is needed.
fn downsample_2x2_box(src: &SliceView<'_>, dst: &mut [LinearColor], dst_width: usize, parallel: bool) {
    for_each_row(dst, dst_width, parallel, |dest_y, row| {
        for (dest_x, out) in row.iter_mut().enumerate() {
            let sx = dest_x * 2;
            let sy = dest_y * 2;
            *out = (src.get_unchecked(sx, sy)
                + src.get_unchecked(sx + 1, sy)
                + src.get_unchecked(sx, sy + 1)
                + src.get_unchecked(sx + 1, sy + 1))
                * 0.25;
        }
    });
}

/// Downsamples one slice into `dst` using the kernel and addressing in
/// `options`.
///
/// The destination must satisfy `src_dim == scale_factor * dst_dim` per
/// axis, except when the destination dimension is already 1.
pub fn downsample(
    src: &SliceView<'_>,
    dst: &mut [LinearColor],
    dst_width: usize,
    dst_height: usize,
    options: &DownsampleOptions<'_>,
) {
    debug_assert!(
        src.width() == options.scale_factor * dst_width || dst_width == 1,
        "source width {} does not match destination {} at scale {}",
        src.width(),
        dst_width,
        options.scale_factor
    );
    debug_assert!(src.height() == options.scale_factor * dst_height || dst_height == 1);
    debug_assert_eq!(dst.len(), dst_width * dst_height);

    let kernel = options.kernel;
    let table_size = kernel.size();

    if table_size == 2
        && options.scale_factor == 2
        && dst_width * 2 == src.width()
        && dst_height * 2 == src.height()
        && !options.alpha_scale_active()
        && !options.unfiltered
    {
        // sharpen_without_color_shift is meaningless for a box kernel
        downsample_2x2_box(src, dst, dst_width, options.parallel);
        return;
    }

    // odd tables stay centered, even tables shift back by half
    let kernel_center = (table_size as i64 - 1) / 2;
    let scale = options.scale_factor as i64;
    let [sr, sg, sb, sa] = options.alpha_scale;

    for_each_row(dst, dst_width, options.parallel, |dest_y, row| {
        for (dest_x, out) in row.iter_mut().enumerate() {
            let source_x = dest_x as i64 * scale;
            let source_y = dest_y as i64 * scale;

            let mut filtered = if options.unfiltered {
                src.get(source_x, source_y)
            } else if table_size == 2 {
                (src.get(source_x, source_y)
                    + src.get(source_x + 1, source_y)
                    + src.get(source_x, source_y + 1)
                    + src.get(source_x + 1, source_y + 1))
                    * 0.25
            } else if options.sharpen_without_color_shift {
                let mut sharpened = LinearColor::default();
                for ky in 0..table_size {
                    for kx in 0..table_size {
                        let weight = kernel.at(kx, ky);
                        let sample = src.get(
                            source_x + kx as i64 - kernel_center,
                            source_y + ky as i64 - kernel_center,
                        );
                        sharpened += sample * weight;
                    }
                }
                let new_luminance = sharpened.luminance();

                let mut boxed = (src.get(source_x, source_y)
                    + src.get(source_x + 1, source_y)
                    + src.get(source_x, source_y + 1)
                    + src.get(source_x + 1, source_y + 1))
                    * 0.25;
                let old_luminance = boxed.luminance();
                if old_luminance > 0.001 {
                    let factor = new_luminance / old_luminance;
                    boxed.r *= factor;
                    boxed.g *= factor;
                    boxed.b *= factor;
                }
                boxed.a = sharpened.a;
                boxed
            } else {
                let mut filtered = LinearColor::default();
                for ky in 0..table_size {
                    for kx in 0..table_size {
                        let weight = kernel.at(kx, ky);
                        let sample = src.get(
                            source_x + kx as i64 - kernel_center,
                            source_y + ky as i64 - kernel_center,
                        );
                        filtered += sample * weight;
                    }
                }
                filtered
            };

            filtered.r *= sr;
            filtered.g *= sg;
            filtered.b *= sb;
            filtered.a *= sa;
            *out = filtered;
        }
    });
}

/// Volume variant: filters each of the two source slices independently,
/// then averages the results. `src_b` is absent for odd trailing slices.
pub fn downsample_volume(
    src_a: &SliceView<'_>,
    src_b: Option<&SliceView<'_>>,
    dst: &mut [LinearColor],
    dst_width: usize,
    dst_height: usize,
    options: &DownsampleOptions<'_>,
) {
    downsample(src_a, dst, dst_width, dst_height, options);

    if let Some(src_b) = src_b {
        if !options.unfiltered {
            let mut temp = vec![LinearColor::default(); dst_width * dst_height];
            downsample(src_b, &mut temp, dst_width, dst_height, options);
            for (out, second) in dst.iter_mut().zip(&temp) {
                *out = (*out + *second) * 0.5;
            }
        }
    }
}

/// Recomputes destination border texels as the unweighted average of only
/// the source texels that lie on the source border. This replaces the
/// general filter result on the border ring.
pub fn regenerate_border(
    src: &SliceView<'_>,
    dst: &mut [LinearColor],
    dst_width: usize,
    dst_height: usize,
) {
    debug_assert!(src.width() == 2 * dst_width || dst_width == 1);
    debug_assert!(src.height() == 2 * dst_height || dst_height == 1);

    for dest_y in 0..dst_height {
        let mut dest_x = 0;
        while dest_x < dst_width {
            let mut filtered = LinearColor::default();
            let mut weight_sum = 0.0f32;
            for ky in 0..2usize {
                for kx in 0..2usize {
                    let source_x = dest_x * 2 + kx;
                    let source_y = dest_y * 2 + ky;
                    if source_x == 0
                        || source_x == src.width() - 1
                        || source_y == 0
                        || source_y == src.height() - 1
                    {
                        filtered += src.get(source_x as i64, source_y as i64);
                        weight_sum += 1.0;
                    }
                }
            }
            if weight_sum > 0.0 {
                dst[dest_y * dst_width + dest_x] = filtered / weight_sum;
            }

            dest_x += 1;
            if dest_y > 0 && dest_y < dst_height - 1 && dest_x > 0 && dest_x < dst_width - 1 {
                // jump over the interior
                dest_x += (dst_width - 2).max(1);
            }
        }
    }
}

/// Final-step filter for fractional downscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownscaleFilter {
    /// Bilinear sample at the scaled position.
    SimpleAverage,
    /// 8-tap sharpen kernel over bilinear samples; level 0 to 10 maps to
    /// sharpen factors 0.0 to 2.0.
    Sharpen(u8),
    /// Nearest sample.
    Unfiltered,
}

/// Downscales the top mip by a fractional factor in [1, 8].
///
/// Repeated 2x2 averaging handles factors above 2; the final step resolves
/// the remaining fraction with the requested filter. When `block_size > 1`
/// and the source is block-aligned, the final size snaps to preserve the
/// block aspect ratio. Returns the source unchanged for factors <= 1.
pub fn downscale_image(
    src: &Image,
    downscale: f32,
    block_size: usize,
    filter: DownscaleFilter,
    parallel: bool,
) -> Image {
    if downscale <= 1.0 {
        return src.clone();
    }

    let downscale = downscale.clamp(1.0, 8.0);
    let mut final_w = (src.width() as f32 / downscale).ceil() as usize;
    let mut final_h = (src.height() as f32 / downscale).ceil() as usize;

    if block_size > 1 && src.width() % block_size == 0 && src.height() % block_size == 0 {
        let blocks_x = src.width() / block_size;
        let blocks_y = src.height() / block_size;
        let gcd = gcd(blocks_x, blocks_y);
        let ratio_x = blocks_x / gcd;
        let ratio_y = blocks_y / gcd;
        let final_blocks_x = grid_snap(final_w as f32 / block_size as f32, ratio_x as f32);
        let final_blocks_y = final_blocks_x / ratio_x * ratio_y;
        final_w = final_blocks_x * block_size;
        final_h = final_blocks_y * block_size;
    }

    let unfiltered = filter == DownscaleFilter::Unfiltered;
    let box_kernel = FilterKernel::build(2, 0.0);
    let mut current = src.clone();
    let mut remaining = src.width() as f32 / final_w as f32;

    while remaining > 2.0 {
        let dst_w = current.width() / 2;
        let dst_h = current.height() / 2;
        let mut next = Image::new_rgba32f(dst_w, dst_h, current.num_slices());
        let mut options = DownsampleOptions::new(&box_kernel, AddressMode::Clamp);
        options.unfiltered = unfiltered;
        options.parallel = parallel;
        for slice in 0..current.num_slices() {
            let view = current.slice_view(slice, AddressMode::Clamp);
            downsample(&view, next.slice_colors_mut(slice), dst_w, dst_h, &options);
        }
        current = next;
        remaining /= 2.0;
    }

    if current.width() == final_w && current.height() == final_h {
        return current;
    }

    let (kernel_size, sharpening) = match filter {
        DownscaleFilter::Sharpen(level) => (8, level.min(10) as f32 * 0.2),
        _ => (2, 0.0),
    };
    let kernel = FilterKernel::build(kernel_size, sharpening);
    let kernel_center = (kernel.size() / 2) as i32 - 1;
    let bilinear = filter == DownscaleFilter::SimpleAverage;

    let mut out = Image::new(
        final_w,
        final_h,
        current.num_slices(),
        PixelFormat::Rgba32F,
        GammaSpace::Linear,
    );
    let step = current.width() as f32 / final_w as f32;

    for slice in 0..current.num_slices() {
        let view = current.slice_view(slice, AddressMode::Clamp);
        let dst = out.slice_colors_mut(slice);
        for y in 0..final_h {
            let source_y = y as f32 * step;
            for x in 0..final_w {
                let source_x = x as f32 * step;
                let color = if unfiltered {
                    view.get(source_x.round() as i64, source_y.round() as i64)
                } else if bilinear {
                    view.sample_bilinear(source_x, source_y)
                } else {
                    let mut filtered = LinearColor::default();
                    for ky in 0..kernel.size() {
                        for kx in 0..kernel.size() {
                            let weight = kernel.at(kx, ky);
                            let sample = view.sample_bilinear(
                                source_x + (kx as i32 - kernel_center) as f32,
                                source_y + (ky as i32 - kernel_center) as f32,
                            );
                            filtered += sample * weight;
                        }
                    }
                    filtered
                };
                dst[y * final_w + x] = color;
            }
        }
    }
    out
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn grid_snap(value: f32, grid: f32) -> usize {
    ((value / grid).round() * grid) as usize
}
