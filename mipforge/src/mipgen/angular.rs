//! Angular (cosine-lobe) filtering for HDR cubemaps.
//!
//! Each output level integrates a cone over the full-resolution cube. The
//! cone angle grows from near zero at the top mip (a sharp copy) to pi/2
//! at the bottom (full diffuse convolution). Integration walks each face
//! with a recursive quadtree rasterizer that rejects regions outside the
//! cone via a sphere/cone intersection test.

use crate::color::LinearColor;
use crate::image::Image;
use rayon::prelude::*;
use std::f32::consts::PI;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

impl Vec3 {
    const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    fn normalized(self) -> Self {
        let len = self.length();
        Self::new(self.x / len, self.y / len, self.z / len)
    }

    fn scaled(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// Face-local direction to world space, D3D cube face order, with the
/// engine's y/z swap applied on the way out.
fn transform_side_to_world(face: usize, d: Vec3) -> Vec3 {
    let (x, y, z) = (d.x, d.y, d.z);
    let r = match face {
        0 => Vec3::new(z, -y, -x),
        1 => Vec3::new(-z, -y, x),
        2 => Vec3::new(x, z, y),
        3 => Vec3::new(x, -z, -y),
        4 => Vec3::new(x, -y, z),
        5 => Vec3::new(-x, -y, -z),
        _ => unreachable!("cube face index out of range"),
    };
    Vec3::new(r.x, r.z, r.y)
}

/// World space to face-local direction; inverse of
/// [`transform_side_to_world`].
fn transform_world_to_side(face: usize, d: Vec3) -> Vec3 {
    let (x, y, z) = (d.x, d.z, d.y);
    match face {
        0 => Vec3::new(-z, -y, x),
        1 => Vec3::new(z, -y, -x),
        2 => Vec3::new(x, z, y),
        3 => Vec3::new(x, -z, -y),
        4 => Vec3::new(x, -y, z),
        5 => Vec3::new(-x, -y, -z),
        _ => unreachable!("cube face index out of range"),
    }
}

fn side_direction_at_texel_center(x: usize, y: usize, inv_side_extent: f32) -> Vec3 {
    Vec3::new(
        (x as f32 + 0.5) * inv_side_extent * 2.0 - 1.0,
        (y as f32 + 0.5) * inv_side_extent * 2.0 - 1.0,
        1.0,
    )
    .normalized()
}

fn world_direction_at_texel_center(face: usize, x: usize, y: usize, inv_side_extent: f32) -> Vec3 {
    transform_side_to_world(face, side_direction_at_texel_center(x, y, inv_side_extent))
}

/// Sphere/cone intersection with the cone tip at the origin.
fn sphere_cone_intersection(
    sphere_center: Vec3,
    sphere_radius: f32,
    cone_axis: Vec3,
    cone_angle_sin: f32,
    cone_angle_cos: f32,
) -> bool {
    let u = cone_axis.scaled(-sphere_radius / cone_angle_sin);
    let d = sphere_center.sub(u);
    let d_size_sq = d.dot(d);
    let e = cone_axis.dot(d);

    if e > 0.0 && e * e >= d_size_sq * cone_angle_cos * cone_angle_cos {
        let d_size_sq = sphere_center.dot(sphere_center);
        let e = -cone_axis.dot(sphere_center);
        if e > 0.0 && e * e >= d_size_sq * cone_angle_sin * cone_angle_sin {
            d_size_sq <= sphere_radius * sphere_radius
        } else {
            true
        }
    } else {
        false
    }
}

/// Accumulates cone-weighted texels of one cube face.
struct TexelProcessor<'a> {
    cone_axis_ss: Vec3,
    accumulated: LinearColor,
    cone_angle_sin: f32,
    cone_angle_cos: f32,
    position_to_world: f32,
    radius_to_world: f32,
    inv_full_extent: f32,
    dir_dot: f32,
    inv_dir_one_minus_dot: f32,
    side_data: &'a [LinearColor],
    texel_area: &'a [f32],
    full_extent: usize,
}

impl<'a> TexelProcessor<'a> {
    fn new(
        cone_axis_ss: Vec3,
        cone_angle: f32,
        side_data: &'a [LinearColor],
        texel_area: &'a [f32],
        full_extent: usize,
    ) -> Self {
        // sqrt(2*2 + 2*2), circumscribing sphere of a [-1,1] quad
        let sqrt8 = 2.828_427_1_f32;
        Self {
            cone_axis_ss,
            accumulated: LinearColor::default(),
            cone_angle_sin: cone_angle.sin(),
            cone_angle_cos: cone_angle.cos(),
            position_to_world: 2.0 / full_extent as f32,
            radius_to_world: sqrt8 / full_extent as f32,
            inv_full_extent: 1.0 / full_extent as f32,
            dir_dot: cone_angle.cos().min(0.9999),
            inv_dir_one_minus_dot: 1.0 / (1.0 - cone_angle.cos().min(0.9999)),
            side_data,
            texel_area,
            full_extent,
        }
    }

    fn test_if_relevant(&self, x: usize, y: usize, local_extent: usize) -> bool {
        let half = local_extent as f32 * 0.5;
        let u = (x as f32 + half) * self.position_to_world - 1.0;
        let v = (y as f32 + half) * self.position_to_world - 1.0;
        let sphere_radius = self.radius_to_world * local_extent as f32;
        sphere_cone_intersection(
            Vec3::new(u, v, 1.0),
            sphere_radius,
            self.cone_axis_ss,
            self.cone_angle_sin,
            self.cone_angle_cos,
        )
    }

    fn process(&mut self, x: usize, y: usize) {
        let sample = self.side_data[x + y * self.full_extent];
        let direction = side_direction_at_texel_center(x, y, self.inv_full_extent);
        let dot = self.cone_axis_ss.dot(direction);

        if dot > self.dir_dot {
            // 0 at the kernel border, 1 at the center, smoothstepped
            let mut weight = 1.0 - (1.0 - dot) * self.inv_dir_one_minus_dot;
            weight = weight * weight * (3.0 - 2.0 * weight);

            // area compensation stays off: weighting by solid angle
            // reintroduces a visible seam at face edges
            let _area = self.texel_area[x + y * self.full_extent];

            self.accumulated.r += weight * sample.r;
            self.accumulated.g += weight * sample.g;
            self.accumulated.b += weight * sample.b;
            self.accumulated.a += weight;
        }
    }

    /// Quadtree walk over the face, splitting regions the cone touches.
    fn rasterize(&mut self, x: usize, y: usize, extent: usize) {
        if extent > 1 {
            if !self.test_if_relevant(x, y, extent) {
                return;
            }
            let extent = extent / 2;
            self.rasterize(x, y, extent);
            self.rasterize(x + extent, y, extent);
            self.rasterize(x, y + extent, extent);
            self.rasterize(x + extent, y + extent, extent);
        } else {
            self.process(x, y);
        }
    }
}

/// Integrates the cone around `direction_ws` over all six faces of the
/// source cube. The weight sum accumulates in alpha and renormalizes the
/// result; output alpha is zero.
fn integrate_angular_area(
    src: &Image,
    direction_ws: Vec3,
    cone_angle: f32,
    texel_area: &[f32],
) -> LinearColor {
    let extent = src.width();
    let mut sum = LinearColor::default();

    for face in 0..6 {
        let cone_axis_ss = transform_world_to_side(face, direction_ws);
        let mut processor = TexelProcessor::new(
            cone_axis_ss,
            cone_angle,
            src.slice_colors(face),
            texel_area,
            extent,
        );
        processor.rasterize(0, 0, extent);
        sum += processor.accumulated;
    }

    if sum.a != 0.0 {
        let inv = 1.0 / sum.a;
        sum.r *= inv;
        sum.g *= inv;
        sum.b *= inv;
    }
    sum.a = 0.0;
    sum
}

/// Face extent used when projecting an equirectangular source to a cube.
pub fn long_lat_cubemap_extent(src_width: usize, max_resolution: usize) -> usize {
    let pow2 = 1usize << ((src_width / 2).max(1).ilog2());
    pow2.clamp(32, max_resolution.max(32))
}

fn lookup_long_lat(src: &Image, slice: usize, direction: Vec3) -> LinearColor {
    // equirectangular mapping, texel centers at integer coordinates
    let w = src.width();
    let h = src.height();
    let x = (1.0 + direction.x.atan2(-direction.z) / PI) / 2.0 * w as f32;
    let y = direction.y.clamp(-1.0, 1.0).acos() / PI * h as f32;

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x0 = x0 as i64;
    let y0 = y0 as i64;
    let wrap_x = |v: i64| v.rem_euclid(w as i64) as usize;
    let clamp_y = |v: i64| v.clamp(0, h as i64 - 1) as usize;
    let pixels = src.slice_colors(slice);
    let at = |px: usize, py: usize| pixels[py * w + px];

    let c00 = at(wrap_x(x0), clamp_y(y0));
    let c10 = at(wrap_x(x0 + 1), clamp_y(y0));
    let c01 = at(wrap_x(x0), clamp_y(y0 + 1));
    let c11 = at(wrap_x(x0 + 1), clamp_y(y0 + 1));
    let top = LinearColor::lerp(c00, c10, fx);
    let bottom = LinearColor::lerp(c01, c11, fx);
    LinearColor::lerp(top, bottom, fy)
}

/// Projects a linear long-lat equirectangular image into a 6-face cube
/// base mip. Each source slice expands to six consecutive face slices.
pub fn generate_base_cube_mip_from_long_lat(src: &Image, max_resolution: usize) -> Image {
    let extent = long_lat_cubemap_extent(src.width(), max_resolution);
    let inv_extent = 1.0 / extent as f32;
    let mut out = Image::new_rgba32f(extent, extent, src.num_slices() * 6);

    for slice in 0..src.num_slices() {
        for face in 0..6 {
            let face_pixels = out.slice_colors_mut(slice * 6 + face);
            for y in 0..extent {
                for x in 0..extent {
                    let direction = world_direction_at_texel_center(face, x, y, inv_extent);
                    face_pixels[y * extent + x] = lookup_long_lat(src, slice, direction);
                }
            }
        }
    }
    out
}

/// Faces at or above this extent get one worker task per face.
const PARALLEL_FACE_EXTENT: usize = 128;

fn generate_angular_filtered_mip(src: &Image, extent: usize, cone_angle: f32, parallel: bool) -> Image {
    let mut dest = Image::new_rgba32f(extent, extent, 6);
    let inv_extent = 1.0 / extent as f32;

    // one face's solid-angle table; identical for every face
    let src_extent = src.width();
    let mut texel_area = vec![0.0f32; src_extent * src_extent];
    for y in 0..src_extent {
        for x in 0..src_extent {
            texel_area[y * src_extent + x] = compute_texel_area(x, y, inv_extent * 2.0);
        }
    }
    let texel_area = &texel_area;

    let fill_face = |face: usize, pixels: &mut [LinearColor]| {
        for y in 0..extent {
            for x in 0..extent {
                let direction = world_direction_at_texel_center(face, x, y, inv_extent);
                pixels[y * extent + x] =
                    integrate_angular_area(src, direction, cone_angle, texel_area);
            }
        }
    };

    let face_len = extent * extent;
    if parallel && src.width() >= PARALLEL_FACE_EXTENT {
        dest.colors_mut()
            .par_chunks_mut(face_len)
            .enumerate()
            .for_each(|(face, pixels)| fill_face(face, pixels));
    } else {
        for (face, pixels) in dest.colors_mut().chunks_mut(face_len).enumerate() {
            fill_face(face, pixels);
        }
    }
    dest
}

/// Replaces `chain` with `num_mips` angularly filtered levels.
///
/// The incoming chain holds the box-filtered cube levels, largest first;
/// missing smaller levels are synthesized by 2x2 averaging. Levels below
/// `diffuse_convolve_mip_level` blend toward the full diffuse convolution.
pub fn generate_angular_filtered_mips(
    chain: &mut Vec<Image>,
    num_mips: usize,
    diffuse_convolve_mip_level: u32,
    parallel: bool,
) {
    let mut src_chain = std::mem::take(chain);

    // extend with simple averaged levels to speed up cone lookups
    while src_chain.len() < num_mips {
        let base = src_chain.last().expect("chain holds at least the base level");
        let base_extent = base.width();
        let extent = (base_extent >> 1).max(1);
        let mut mip = Image::new_rgba32f(extent, extent, base.num_slices());
        for face in 0..base.num_slices() {
            let src_pixels = base.slice_colors(face);
            let dst_pixels = mip.slice_colors_mut(face);
            for y in 0..extent {
                for x in 0..extent {
                    let sum = (src_pixels[(y * 2) * base_extent + x * 2]
                        + src_pixels[(y * 2) * base_extent + x * 2 + 1]
                        + src_pixels[(y * 2 + 1) * base_extent + x * 2]
                        + src_pixels[(y * 2 + 1) * base_extent + x * 2 + 1])
                        * 0.25;
                    dst_pixels[y * extent + x] = sum;
                }
            }
        }
        src_chain.push(mip);
    }

    let base_extent = 1usize << (num_mips - 1);
    let mut extent = base_extent;

    for i in 0..num_mips {
        // 0 is the top mip, the lowest level is the diffuse convolution
        let normalized_level = i as f32 / (num_mips as f32 - diffuse_convolve_mip_level as f32);
        let adjusted_level = normalized_level * num_mips as f32;
        let normalized_width = base_extent as f32 * (-adjusted_level).exp2();
        let texel_size = 1.0 / normalized_width;

        let cone_angle = (PI / 2.0 * texel_size).clamp(0.002, PI / 2.0);

        // larger bias trades speed for precision on the input lookup
        let quality_bias = 3.0f32;
        // sphere with surface area 1, 0.5 * sqrt(1/pi)
        let sphere_radius = 0.282_094_78_f32;
        let segment_height = sphere_radius * (1.0 - cone_angle.cos());
        let covered_area = 2.0 * PI * sphere_radius * segment_height;

        let float_input_mip = 0.5 * covered_area.log2() + num_mips as f32 - quality_bias;
        let input_mip = (float_input_mip as i32).clamp(0, num_mips as i32 - 1) as usize;

        debug!(
            level = i,
            cone_angle_deg = cone_angle * 180.0 / PI,
            input_mip,
            "angular filtered mip"
        );

        chain.push(generate_angular_filtered_mip(
            &src_chain[input_mip],
            extent,
            cone_angle,
            parallel,
        ));
        extent = (extent >> 1).max(1);
    }
}

fn compute_texel_area(x: usize, y: usize, inv_side_extent_mul2: f32) -> f32 {
    let fu = x as f32 * inv_side_extent_mul2 - 1.0;
    let fv = y as f32 * inv_side_extent_mul2 - 1.0;

    let a = Vec3::new(fu, fv, 1.0).normalized();
    let b = Vec3::new(fu + inv_side_extent_mul2, fv, 1.0).normalized();
    let c = Vec3::new(fu, fv + inv_side_extent_mul2, 1.0).normalized();
    let d = Vec3::new(fu + inv_side_extent_mul2, fv + inv_side_extent_mul2, 1.0).normalized();

    let tri_a = a.sub(b).cross(c.sub(b)).length();
    let tri_b = c.sub(b).cross(d.sub(b)).length();
    tri_a + tri_b * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_world_round_trip() {
        for face in 0..6 {
            let d = Vec3::new(0.3, -0.2, 1.0).normalized();
            let world = transform_side_to_world(face, d);
            let back = transform_world_to_side(face, world);
            assert!((back.x - d.x).abs() < 1e-6, "face {face}");
            assert!((back.y - d.y).abs() < 1e-6, "face {face}");
            assert!((back.z - d.z).abs() < 1e-6, "face {face}");
        }
    }

    #[test]
    fn test_sphere_cone_intersection() {
        let axis = Vec3::new(0.0, 0.0, 1.0);
        let angle: f32 = 0.5;
        // sphere on the axis intersects
        assert!(sphere_cone_intersection(
            Vec3::new(0.0, 0.0, 2.0),
            0.1,
            axis,
            angle.sin(),
            angle.cos()
        ));
        // sphere far off axis does not
        assert!(!sphere_cone_intersection(
            Vec3::new(5.0, 0.0, 0.1),
            0.1,
            axis,
            angle.sin(),
            angle.cos()
        ));
    }

    #[test]
    fn test_long_lat_extent() {
        assert_eq!(long_lat_cubemap_extent(1024, 4096), 512);
        assert_eq!(long_lat_cubemap_extent(1024, 128), 128);
        assert_eq!(long_lat_cubemap_extent(16, 4096), 32);
    }

    #[test]
    fn test_uniform_long_lat_gives_uniform_cube() {
        let color = LinearColor::new(0.5, 1.5, 3.0, 1.0);
        let mut src = Image::new_rgba32f(64, 32, 1);
        src.colors_mut().fill(color);
        let cube = generate_base_cube_mip_from_long_lat(&src, 4096);
        assert_eq!(cube.num_slices(), 6);
        assert_eq!(cube.width(), 32);
        for c in cube.colors() {
            assert!(c.nearly_equals(&color, 1e-4));
        }
    }

    #[test]
    fn test_angular_filter_preserves_uniform_color() {
        let color = LinearColor::new(0.25, 0.5, 1.0, 1.0);
        let mut base = Image::new_rgba32f(8, 8, 6);
        base.colors_mut().fill(color);
        let mut chain = vec![base];
        generate_angular_filtered_mips(&mut chain, 4, 0, false);
        assert_eq!(chain.len(), 4);
        for (level, mip) in chain.iter().enumerate() {
            assert_eq!(mip.num_slices(), 6);
            for c in mip.colors() {
                assert!((c.r - color.r).abs() < 1e-3, "level {level} red drifted");
                assert!((c.g - color.g).abs() < 1e-3, "level {level} green drifted");
                assert!(c.a == 0.0);
            }
        }
    }
}
