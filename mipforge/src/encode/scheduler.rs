//! Fan-out of mip compression across worker threads.
//!
//! Each mip (or merged mip tail) owns one pre-sized output slot, so the
//! gather order never depends on task completion order and the output
//! bytes are identical with or without parallel dispatch.

use crate::encode::adapter::encode_mip_group;
use crate::encode::encoder::{BlockEncoder, CompressedImage};
use crate::encode::format::BLOCK_DIM;
use crate::encode::params::EncodeParams;
use crate::error::{EncodeError, TextureError, ValidationError};
use crate::image::Image;
use tracing::debug;

/// Mips below this extent compress inline on the calling thread; the
/// per-task overhead is not worth it for small surfaces.
pub const MIN_ASYNC_COMPRESSION_SIZE: usize = 512;

/// One unit of encode work: a run of consecutive mips compressed by a
/// single encoder call.
struct MipGroup {
    first_mip: usize,
    len: usize,
}

/// Splits the chain into per-mip groups plus one merged group covering
/// the encoder's mip tail.
fn plan_groups(num_mips: usize, mips_in_tail: usize) -> Vec<MipGroup> {
    let first_tail = if mips_in_tail > 1 && num_mips > mips_in_tail {
        num_mips - mips_in_tail
    } else if mips_in_tail > 1 {
        0
    } else {
        num_mips
    };

    let mut groups: Vec<MipGroup> = (0..first_tail)
        .map(|i| MipGroup { first_mip: i, len: 1 })
        .collect();
    if first_tail < num_mips {
        groups.push(MipGroup {
            first_mip: first_tail,
            len: num_mips - first_tail,
        });
    }
    groups
}

/// Compress a whole mip chain.
///
/// Large mips (min extent at least [`MIN_ASYNC_COMPRESSION_SIZE`]) are
/// spawned as parallel tasks when `allow_parallel` is set; the small
/// mips compress inline while those tasks run. When the encoder merges
/// a mip tail, the tail's data lands in its first slot and the
/// remaining tail slots carry dimensions only, with empty data.
///
/// Output order matches input order, largest mip first.
///
/// # Errors
///
/// [`ValidationError::EmptySource`] for an empty chain; any encoder
/// failure is wrapped in [`TextureError::Encode`] with the index of the
/// first mip of the failing group, and no output is returned.
pub fn compress_mip_chain(
    encoder: &dyn BlockEncoder,
    mips: &[Image],
    params: &EncodeParams,
    allow_parallel: bool,
) -> Result<Vec<CompressedImage>, TextureError> {
    if mips.is_empty() {
        return Err(ValidationError::EmptySource.into());
    }

    let caps = encoder.capabilities();
    let groups = plan_groups(mips.len(), caps.mips_in_tail);
    debug!(
        mips = mips.len(),
        groups = groups.len(),
        format = %params.format,
        parallel = allow_parallel,
        "compressing mip chain"
    );

    let inline_jobs = if allow_parallel {
        rayon::current_num_threads()
    } else {
        1
    };

    let mut results: Vec<Option<Result<CompressedImage, EncodeError>>> =
        groups.iter().map(|_| None).collect();
    rayon::scope(|scope| {
        let mut slots: &mut [Option<Result<CompressedImage, EncodeError>>] = &mut results;
        for group in &groups {
            let (slot, rest) = slots.split_first_mut().expect("one slot per group");
            slots = rest;
            let group_mips = &mips[group.first_mip..group.first_mip + group.len];
            let lead = &group_mips[0];
            let spawn = allow_parallel
                && lead.width().min(lead.height()) >= MIN_ASYNC_COMPRESSION_SIZE;
            if spawn {
                scope.spawn(move |_| {
                    *slot = Some(encode_mip_group(encoder, group_mips, params, 1));
                });
            } else {
                // small mips are pre-work, done while the spawned
                // tasks chew on the large ones
                *slot = Some(encode_mip_group(encoder, group_mips, params, inline_jobs));
            }
        }
    });

    let mut output = Vec::with_capacity(mips.len());
    for (group, result) in groups.iter().zip(results) {
        let compressed = result
            .expect("every slot is filled before the scope ends")
            .map_err(|source| TextureError::Encode {
                mip: group.first_mip,
                source,
            })?;
        output.push(compressed);
        // dimension-only slots for the rest of a merged tail
        for tail_mip in &mips[group.first_mip + 1..group.first_mip + group.len] {
            output.push(CompressedImage {
                data: Vec::new(),
                width: block_aligned(tail_mip.width()),
                height: block_aligned(tail_mip.height()),
                depth: tail_mip.num_slices(),
                format: params.format,
            });
        }
    }
    Ok(output)
}

fn block_aligned(extent: usize) -> usize {
    extent.div_ceil(BLOCK_DIM) * BLOCK_DIM
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::LinearColor;
    use crate::encode::encoder::EncoderCapabilities;
    use crate::encode::format::{BlockFormat, FormatTable};
    use crate::encode::params::resolve_encode_params;
    use crate::encode::reference::ReferenceEncoder;
    use crate::settings::BuildSettings;

    fn params_for(name: &str) -> EncodeParams {
        let settings = BuildSettings::new(name);
        resolve_encode_params(&settings, false, &FormatTable::standard()).unwrap()
    }

    fn chain(top: usize) -> Vec<Image> {
        let mut mips = Vec::new();
        let mut extent = top;
        loop {
            let mut mip = Image::new_rgba32f(extent, extent, 1);
            for c in mip.colors_mut() {
                *c = LinearColor::new(1.0, 0.0, 0.0, 1.0);
            }
            mips.push(mip);
            if extent == 1 {
                break;
            }
            extent /= 2;
        }
        mips
    }

    #[test]
    fn test_plan_groups_no_tail() {
        let groups = plan_groups(5, 1);
        assert_eq!(groups.len(), 5);
        assert!(groups.iter().all(|g| g.len == 1));
    }

    #[test]
    fn test_plan_groups_merges_tail() {
        let groups = plan_groups(9, 3);
        assert_eq!(groups.len(), 7);
        assert_eq!(groups[5].len, 1);
        assert_eq!(groups[6].first_mip, 6);
        assert_eq!(groups[6].len, 3);
    }

    #[test]
    fn test_plan_groups_tail_larger_than_chain() {
        let groups = plan_groups(2, 4);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].first_mip, 0);
        assert_eq!(groups[0].len, 2);
    }

    #[test]
    fn test_compress_chain_sizes() {
        let mips = chain(16);
        let params = params_for("BC1");
        let out = compress_mip_chain(&ReferenceEncoder::new(), &mips, &params, false).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out[0].data.len(), 4 * 4 * 8);
        assert_eq!(out[4].data.len(), 8);
        assert_eq!(out[4].width, 4);
    }

    #[test]
    fn test_parallel_and_serial_identical() {
        let mut mips = Vec::new();
        let mut extent = 64usize;
        let mut seed = 7u32;
        while extent >= 1 {
            let mut mip = Image::new_rgba32f(extent, extent, 1);
            for c in mip.colors_mut() {
                seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
                *c = LinearColor::new(
                    (seed >> 24) as f32 / 255.0,
                    (seed >> 16 & 0xFF) as f32 / 255.0,
                    (seed >> 8 & 0xFF) as f32 / 255.0,
                    1.0,
                );
            }
            mips.push(mip);
            extent /= 2;
        }
        let params = params_for("BC3");
        let encoder = ReferenceEncoder::new();
        let serial = compress_mip_chain(&encoder, &mips, &params, false).unwrap();
        let parallel = compress_mip_chain(&encoder, &mips, &params, true).unwrap();
        assert_eq!(serial.len(), parallel.len());
        for (a, b) in serial.iter().zip(&parallel) {
            assert_eq!(a.data, b.data);
        }
    }

    #[test]
    fn test_empty_chain_rejected() {
        let params = params_for("BC1");
        let err = compress_mip_chain(&ReferenceEncoder::new(), &[], &params, false).unwrap_err();
        assert!(matches!(
            err,
            TextureError::Validation(ValidationError::EmptySource)
        ));
    }

    #[test]
    fn test_failure_reports_mip_and_drops_output() {
        let mips = chain(8);
        let params = params_for("BC7");
        let err = compress_mip_chain(&ReferenceEncoder::new(), &mips, &params, false).unwrap_err();
        match err {
            TextureError::Encode { mip, source } => {
                assert_eq!(mip, 0);
                assert_eq!(source, EncodeError::UnsupportedFormat(BlockFormat::Bc7));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Encoder that merges the last three mips into one tail blob.
    struct TailMergingEncoder(ReferenceEncoder);

    impl BlockEncoder for TailMergingEncoder {
        fn capabilities(&self) -> EncoderCapabilities {
            EncoderCapabilities {
                mips_in_tail: 3,
                ..EncoderCapabilities::default()
            }
        }

        fn encode(
            &self,
            format: BlockFormat,
            mips: &[Image],
            params: &EncodeParams,
            job_parallelism: usize,
        ) -> Result<Vec<u8>, EncodeError> {
            self.0.encode(format, mips, params, job_parallelism)
        }
    }

    #[test]
    fn test_tail_slots_carry_dims_only() {
        let mips = chain(16); // 5 mips, tail covers 4, 2, 1
        let params = params_for("BC1");
        let encoder = TailMergingEncoder(ReferenceEncoder::new());
        let out = compress_mip_chain(&encoder, &mips, &params, false).unwrap();
        assert_eq!(out.len(), 5);
        // tail leader holds the data for the three smallest mips
        assert_eq!(out[2].data.len(), 3 * 8);
        assert!(out[3].data.is_empty());
        assert!(out[4].data.is_empty());
        assert_eq!(out[3].width, 4);
        assert_eq!(out[4].width, 4);
        assert_eq!(out[4].format, BlockFormat::Bc1);
    }
}
