//! BC4 single-channel block compression.
//!
//! Each 4x4 block of 8-bit values compresses to 8 bytes:
//! - 1 byte: endpoint 0
//! - 1 byte: endpoint 1
//! - 6 bytes: 16 3-bit palette indices
//!
//! Endpoints are kept in `e0 > e1` order so the block decodes with the
//! 8-entry interpolated palette. The same layout doubles as the alpha
//! half of a BC3 block and as each half of a BC5 block.

/// BC4 scalar block encoder.
pub struct GrayBlock;

impl GrayBlock {
    /// Compress 16 channel values to the 8-byte BC4 layout.
    pub fn compress(values: &[u8; 16]) -> [u8; 8] {
        let e0 = *values.iter().max().unwrap_or(&0);
        let e1 = *values.iter().min().unwrap_or(&0);

        let palette = Self::palette(e0, e1);

        let mut indices = 0u64;
        for (i, &v) in values.iter().enumerate() {
            let mut best = 0u64;
            let mut best_dist = u32::MAX;
            for (idx, &entry) in palette.iter().enumerate() {
                let dist = (v as i32 - entry as i32).unsigned_abs();
                if dist < best_dist {
                    best_dist = dist;
                    best = idx as u64;
                }
            }
            indices |= best << (i * 3);
        }

        let mut block = [0u8; 8];
        block[0] = e0;
        block[1] = e1;
        block[2..8].copy_from_slice(&indices.to_le_bytes()[0..6]);
        block
    }

    /// The 8-entry decode palette for the `e0 > e1` mode. When the
    /// endpoints are equal the hardware falls back to the 6-entry mode
    /// with literal 0 and 255 slots; the nearest-entry search then still
    /// maps every value to an endpoint slot.
    fn palette(e0: u8, e1: u8) -> [u8; 8] {
        let a = e0 as u16;
        let b = e1 as u16;
        if e0 > e1 {
            [
                e0,
                e1,
                ((6 * a + b) / 7) as u8,
                ((5 * a + 2 * b) / 7) as u8,
                ((4 * a + 3 * b) / 7) as u8,
                ((3 * a + 4 * b) / 7) as u8,
                ((2 * a + 5 * b) / 7) as u8,
                ((a + 6 * b) / 7) as u8,
            ]
        } else {
            [
                e0,
                e1,
                ((4 * a + b) / 5) as u8,
                ((3 * a + 2 * b) / 5) as u8,
                ((2 * a + 3 * b) / 5) as u8,
                ((a + 4 * b) / 5) as u8,
                0,
                255,
            ]
        }
    }
}
