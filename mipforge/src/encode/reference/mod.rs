//! Built-in deterministic block encoder.
//!
//! Implements the LDR BCn formats with the bounding box endpoint method.
//! Output depends only on the input bytes and parameters, never on the
//! parallelism hint, so parallel and serial builds stay byte-identical.
//! BC6H and BC7 need an external encoder and are reported as
//! unsupported.

mod bc1;
mod bc4;

pub use bc1::ColorBlock;
pub use bc4::GrayBlock;

use crate::encode::encoder::{BlockEncoder, EncoderCapabilities};
use crate::encode::format::{BlockFormat, BLOCK_DIM};
use crate::encode::params::EncodeParams;
use crate::error::EncodeError;
use crate::image::{Image, PixelFormat};
use rayon::prelude::*;

/// The built-in encoder. Stateless; one instance serves every build.
#[derive(Debug, Default)]
pub struct ReferenceEncoder;

impl ReferenceEncoder {
    pub fn new() -> Self {
        Self
    }

    fn supports(format: BlockFormat) -> bool {
        !matches!(format, BlockFormat::Bc6h | BlockFormat::Bc7)
    }
}

impl BlockEncoder for ReferenceEncoder {
    fn capabilities(&self) -> EncoderCapabilities {
        EncoderCapabilities::default()
    }

    fn encode(
        &self,
        format: BlockFormat,
        mips: &[Image],
        params: &EncodeParams,
        job_parallelism: usize,
    ) -> Result<Vec<u8>, EncodeError> {
        if !Self::supports(format) {
            return Err(EncodeError::UnsupportedFormat(format));
        }
        // RDO is a quality knob for external encoders; the built-in
        // path only validates that the lambda was resolved in range.
        if !(0.0..=100.0).contains(&params.rdo_lambda) {
            return Err(EncodeError::InvalidInput(format!(
                "rdo lambda {} out of range",
                params.rdo_lambda
            )));
        }

        let total: usize = mips
            .iter()
            .map(|m| format.slice_byte_size(m.width(), m.height()) * m.num_slices())
            .sum();
        let mut output = vec![0u8; total];

        let mut offset = 0;
        for mip in mips {
            if mip.format() != PixelFormat::Bgra8 {
                return Err(EncodeError::InvalidInput(format!(
                    "expected BGRA8 input for {}, got {}",
                    format,
                    mip.format()
                )));
            }
            let slice_bytes = format.slice_byte_size(mip.width(), mip.height());
            let pixel_bytes = mip.slice_pixel_count() * 4;
            for slice in 0..mip.num_slices() {
                let pixels = &mip.bytes()[slice * pixel_bytes..(slice + 1) * pixel_bytes];
                encode_slice(
                    pixels,
                    mip.width(),
                    mip.height(),
                    format,
                    job_parallelism > 1,
                    &mut output[offset..offset + slice_bytes],
                );
                offset += slice_bytes;
            }
        }
        Ok(output)
    }
}

/// Compress one slice of BGRA8 pixels into `out`, one block row at a
/// time. Rows are independent, so the parallel path splits the output
/// at block row granularity and produces identical bytes.
fn encode_slice(
    pixels: &[u8],
    width: usize,
    height: usize,
    format: BlockFormat,
    parallel: bool,
    out: &mut [u8],
) {
    let blocks_x = BlockFormat::blocks_for(width);
    let blocks_y = BlockFormat::blocks_for(height);
    let row_bytes = blocks_x * format.bytes_per_block();
    debug_assert_eq!(out.len(), row_bytes * blocks_y);

    let encode_row = |by: usize, row_out: &mut [u8]| {
        for bx in 0..blocks_x {
            let block = fetch_block(pixels, width, height, bx, by);
            let dst = &mut row_out[bx * format.bytes_per_block()..][..format.bytes_per_block()];
            encode_block(format, &block, dst);
        }
    };

    if parallel && blocks_y > 1 {
        out.par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(by, row_out)| encode_row(by, row_out));
    } else {
        for (by, row_out) in out.chunks_mut(row_bytes).enumerate() {
            encode_row(by, row_out);
        }
    }
}

/// Gather a 4x4 RGBA block, clamping reads past the right and bottom
/// edges to the last row and column.
fn fetch_block(pixels: &[u8], width: usize, height: usize, bx: usize, by: usize) -> [[u8; 4]; 16] {
    let mut block = [[0u8; 4]; 16];
    for dy in 0..BLOCK_DIM {
        let y = (by * BLOCK_DIM + dy).min(height - 1);
        for dx in 0..BLOCK_DIM {
            let x = (bx * BLOCK_DIM + dx).min(width - 1);
            let p = &pixels[(y * width + x) * 4..][..4];
            // stored as BGRA, gathered as RGBA
            block[dy * BLOCK_DIM + dx] = [p[2], p[1], p[0], p[3]];
        }
    }
    block
}

fn encode_block(format: BlockFormat, block: &[[u8; 4]; 16], dst: &mut [u8]) {
    match format {
        BlockFormat::Bc1 => {
            dst.copy_from_slice(&ColorBlock::compress(block));
        }
        BlockFormat::Bc2 => {
            // explicit 4-bit alpha, two pixels per byte
            for i in 0..8 {
                let lo = block[i * 2][3] >> 4;
                let hi = block[i * 2 + 1][3] >> 4;
                dst[i] = (hi << 4) | lo;
            }
            dst[8..16].copy_from_slice(&ColorBlock::compress(block));
        }
        BlockFormat::Bc3 => {
            let alpha = channel_values(block, 3);
            dst[0..8].copy_from_slice(&GrayBlock::compress(&alpha));
            dst[8..16].copy_from_slice(&ColorBlock::compress(block));
        }
        BlockFormat::Bc4 => {
            let red = channel_values(block, 0);
            dst.copy_from_slice(&GrayBlock::compress(&red));
        }
        BlockFormat::Bc5 => {
            let red = channel_values(block, 0);
            let green = channel_values(block, 1);
            dst[0..8].copy_from_slice(&GrayBlock::compress(&red));
            dst[8..16].copy_from_slice(&GrayBlock::compress(&green));
        }
        BlockFormat::Bc6h | BlockFormat::Bc7 => unreachable!("rejected in encode"),
    }
}

fn channel_values(block: &[[u8; 4]; 16], channel: usize) -> [u8; 16] {
    let mut values = [0u8; 16];
    for (v, pixel) in values.iter_mut().zip(block.iter()) {
        *v = pixel[channel];
    }
    values
}
