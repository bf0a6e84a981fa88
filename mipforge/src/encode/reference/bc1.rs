//! BC1 color block compression.
//!
//! Each 4x4 block of RGB pixels compresses to 8 bytes:
//! - 2 bytes: endpoint 0 (RGB565)
//! - 2 bytes: endpoint 1 (RGB565)
//! - 4 bytes: 16 2-bit palette indices
//!
//! Endpoints are found with the bounding box method and kept in
//! `c0 > c1` order so the block always decodes in 4-color mode. The
//! same color half is reused verbatim inside BC2 and BC3 blocks.

/// Pack 8-bit RGB into 16-bit RGB565.
pub(super) fn pack_rgb565(rgb: [u8; 3]) -> u16 {
    let r = (rgb[0] >> 3) as u16;
    let g = (rgb[1] >> 2) as u16;
    let b = (rgb[2] >> 3) as u16;
    (r << 11) | (g << 5) | b
}

/// Unpack RGB565 to 8-bit RGB, replicating the high bits into the low
/// bits so 0x1F expands to 255 rather than 248.
pub(super) fn unpack_rgb565(c: u16) -> [u8; 3] {
    let r = ((c >> 11) & 0x1F) as u8;
    let g = ((c >> 5) & 0x3F) as u8;
    let b = (c & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

/// Squared distance between a source pixel and a palette entry,
/// weighted for luminance sensitivity (G counts most, B least).
fn weighted_distance(pixel: [u8; 4], entry: [u8; 3]) -> u32 {
    let dr = (pixel[0] as i32 - entry[0] as i32) * 3;
    let dg = (pixel[1] as i32 - entry[1] as i32) * 6;
    let db = pixel[2] as i32 - entry[2] as i32;
    (dr * dr + dg * dg + db * db) as u32
}

/// BC1 color block encoder.
pub struct ColorBlock;

impl ColorBlock {
    /// Compress a 4x4 RGBA block to the 8-byte BC1 color layout. Alpha
    /// is ignored; formats that carry alpha pair this with a separate
    /// alpha block.
    pub fn compress(pixels: &[[u8; 4]; 16]) -> [u8; 8] {
        let (hi, lo) = Self::bounding_endpoints(pixels);

        // c0 > c1 selects 4-color decode; equal endpoints are fine
        // because every index then resolves to the same color.
        let (c0, c1) = if hi >= lo { (hi, lo) } else { (lo, hi) };

        let indices = Self::pick_indices(pixels, c0, c1);

        let mut block = [0u8; 8];
        block[0..2].copy_from_slice(&c0.to_le_bytes());
        block[2..4].copy_from_slice(&c1.to_le_bytes());
        block[4..8].copy_from_slice(&indices.to_le_bytes());
        block
    }

    /// Axis-aligned bounding box of the block's colors, returned as
    /// (max, min) RGB565 endpoints.
    fn bounding_endpoints(pixels: &[[u8; 4]; 16]) -> (u16, u16) {
        let mut lo = [255u8; 3];
        let mut hi = [0u8; 3];
        for pixel in pixels {
            for c in 0..3 {
                lo[c] = lo[c].min(pixel[c]);
                hi[c] = hi[c].max(pixel[c]);
            }
        }
        (pack_rgb565(hi), pack_rgb565(lo))
    }

    /// Build the 4-entry palette and map each pixel to its nearest
    /// entry, packing the 2-bit indices little-endian.
    fn pick_indices(pixels: &[[u8; 4]; 16], c0: u16, c1: u16) -> u32 {
        let e0 = unpack_rgb565(c0);
        let e1 = unpack_rgb565(c1);
        let palette = [e0, e1, Self::mix(e0, e1, 2, 1), Self::mix(e0, e1, 1, 2)];

        let mut indices = 0u32;
        for (i, pixel) in pixels.iter().enumerate() {
            let mut best = 0u32;
            let mut best_dist = u32::MAX;
            for (idx, entry) in palette.iter().enumerate() {
                let dist = weighted_distance(*pixel, *entry);
                if dist < best_dist {
                    best_dist = dist;
                    best = idx as u32;
                }
            }
            indices |= best << (i * 2);
        }
        indices
    }

    /// Weighted thirds blend of two palette endpoints.
    fn mix(a: [u8; 3], b: [u8; 3], wa: u16, wb: u16) -> [u8; 3] {
        let blend = |x: u8, y: u8| ((wa * x as u16 + wb * y as u16) / (wa + wb)) as u8;
        [blend(a[0], b[0]), blend(a[1], b[1]), blend(a[2], b[2])]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb565_primaries_round_trip() {
        for (rgb, packed) in [
            ([0, 0, 0], 0x0000u16),
            ([255, 255, 255], 0xFFFF),
            ([255, 0, 0], 0xF800),
            ([0, 255, 0], 0x07E0),
            ([0, 0, 255], 0x001F),
        ] {
            assert_eq!(pack_rgb565(rgb), packed);
            assert_eq!(unpack_rgb565(packed), rgb);
        }
    }

    #[test]
    fn test_rgb565_replication_limits_error() {
        let original = [123u8, 234, 56];
        let back = unpack_rgb565(pack_rgb565(original));
        assert!((original[0] as i16 - back[0] as i16).abs() <= 4);
        assert!((original[1] as i16 - back[1] as i16).abs() <= 2);
        assert!((original[2] as i16 - back[2] as i16).abs() <= 4);
    }

    #[test]
    fn test_compress_solid_color() {
        let pixels = [[255u8, 0, 0, 255]; 16];
        let block = ColorBlock::compress(&pixels);

        let c0 = u16::from_le_bytes([block[0], block[1]]);
        let c1 = u16::from_le_bytes([block[2], block[3]]);
        assert_eq!(c0, 0xF800);
        assert_eq!(c1, 0xF800);

        // degenerate palette, every index decodes to the same color
        let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
        for i in 0..16 {
            assert!((indices >> (i * 2)) & 0x3 <= 1);
        }
    }

    #[test]
    fn test_compress_two_colors_uses_endpoints() {
        let mut pixels = [[0u8, 0, 0, 255]; 16];
        for p in pixels.iter_mut().skip(8) {
            *p = [255, 255, 255, 255];
        }
        let block = ColorBlock::compress(&pixels);

        let c0 = u16::from_le_bytes([block[0], block[1]]);
        let c1 = u16::from_le_bytes([block[2], block[3]]);
        assert_eq!(c0, 0xFFFF);
        assert_eq!(c1, 0x0000);

        let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
        for i in 0..8 {
            assert_eq!((indices >> (i * 2)) & 0x3, 1, "pixel {i} should map to c1");
        }
        for i in 8..16 {
            assert_eq!((indices >> (i * 2)) & 0x3, 0, "pixel {i} should map to c0");
        }
    }

    #[test]
    fn test_compress_gradient_orders_endpoints() {
        let mut pixels = [[0u8, 0, 0, 255]; 16];
        for (i, p) in pixels.iter_mut().enumerate() {
            let v = (i * 255 / 15) as u8;
            *p = [v, v, v, 255];
        }
        let block = ColorBlock::compress(&pixels);

        let c0 = u16::from_le_bytes([block[0], block[1]]);
        let c1 = u16::from_le_bytes([block[2], block[3]]);
        assert!(c0 > c1);
        assert!(unpack_rgb565(c0)[0] > 200);
        assert!(unpack_rgb565(c1)[0] < 50);
    }

    #[test]
    fn test_bounding_endpoints_span_channels() {
        let mut pixels = [[0u8, 0, 0, 255]; 16];
        pixels[0] = [255, 0, 0, 255];
        pixels[1] = [0, 255, 0, 255];
        pixels[2] = [0, 0, 255, 255];
        let (hi, lo) = ColorBlock::bounding_endpoints(&pixels);
        assert_eq!(unpack_rgb565(hi), [255, 255, 255]);
        assert_eq!(unpack_rgb565(lo), [0, 0, 0]);
    }

    #[test]
    fn test_midpoint_indices_hit_interpolants() {
        let mut pixels = [[0u8, 0, 0, 255]; 16];
        // two thirds of the way from black to white
        pixels[5] = [170, 170, 170, 255];
        pixels[10] = [255, 255, 255, 255];
        let c0 = pack_rgb565([255, 255, 255]);
        let c1 = pack_rgb565([0, 0, 0]);
        let indices = ColorBlock::pick_indices(&pixels, c0, c1);
        assert_eq!((indices >> (5 * 2)) & 0x3, 2);
        assert_eq!((indices >> (10 * 2)) & 0x3, 0);
    }
}
