//! Compressed block formats and the name lookup table.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Block texel extent per axis; every BCn format compresses 4x4 blocks.
pub const BLOCK_DIM: usize = 4;

/// Supported block-compressed target formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockFormat {
    /// RGB + 1-bit alpha, 8 bytes per block.
    Bc1,
    /// RGB + explicit 4-bit alpha, 16 bytes per block.
    Bc2,
    /// RGB + interpolated alpha, 16 bytes per block.
    Bc3,
    /// Single channel, 8 bytes per block.
    Bc4,
    /// Two channels, 16 bytes per block.
    Bc5,
    /// HDR RGB half-float, 16 bytes per block.
    Bc6h,
    /// High quality RGBA, 16 bytes per block.
    Bc7,
}

impl BlockFormat {
    pub const fn bytes_per_block(self) -> usize {
        match self {
            BlockFormat::Bc1 | BlockFormat::Bc4 => 8,
            _ => 16,
        }
    }

    /// True for formats whose input is linear half-float rather than 8-bit.
    pub const fn is_hdr(self) -> bool {
        matches!(self, BlockFormat::Bc6h)
    }

    /// True for formats that expect sRGB-encoded 8-bit color input. The
    /// single- and two-channel formats carry non-color data and stay
    /// linear.
    pub const fn expects_srgb_input(self) -> bool {
        matches!(
            self,
            BlockFormat::Bc1 | BlockFormat::Bc2 | BlockFormat::Bc3 | BlockFormat::Bc7
        )
    }

    /// Blocks along one axis for the given pixel extent.
    pub const fn blocks_for(extent: usize) -> usize {
        extent.div_ceil(BLOCK_DIM)
    }

    /// Compressed byte size of one slice.
    pub const fn slice_byte_size(self, width: usize, height: usize) -> usize {
        Self::blocks_for(width) * Self::blocks_for(height) * self.bytes_per_block()
    }
}

impl fmt::Display for BlockFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockFormat::Bc1 => "BC1",
            BlockFormat::Bc2 => "BC2",
            BlockFormat::Bc3 => "BC3",
            BlockFormat::Bc4 => "BC4",
            BlockFormat::Bc5 => "BC5",
            BlockFormat::Bc6h => "BC6H",
            BlockFormat::Bc7 => "BC7",
        };
        write!(f, "{}", name)
    }
}

enum Mapping {
    Fixed(BlockFormat),
    /// Resolved by alpha presence.
    AutoByAlpha {
        opaque: BlockFormat,
        with_alpha: BlockFormat,
    },
}

/// Immutable mapping from human-authored format names to block formats.
///
/// Built once and injected where needed; there is no global mutable
/// format registry.
pub struct FormatTable {
    entries: Vec<(&'static str, Mapping)>,
}

impl FormatTable {
    /// The standard name set, including the DXT aliases and `AutoDXT`.
    pub fn standard() -> Self {
        use BlockFormat::*;
        let entries = vec![
            ("AUTODXT", Mapping::AutoByAlpha { opaque: Bc1, with_alpha: Bc3 }),
            ("DXT1", Mapping::Fixed(Bc1)),
            ("BC1", Mapping::Fixed(Bc1)),
            ("DXT3", Mapping::Fixed(Bc2)),
            ("BC2", Mapping::Fixed(Bc2)),
            ("DXT5", Mapping::Fixed(Bc3)),
            ("BC3", Mapping::Fixed(Bc3)),
            ("BC4", Mapping::Fixed(Bc4)),
            ("BC5", Mapping::Fixed(Bc5)),
            ("BC6H", Mapping::Fixed(Bc6h)),
            ("BC7", Mapping::Fixed(Bc7)),
        ];
        Self { entries }
    }

    /// Resolves a format name, case-insensitively.
    ///
    /// `force_bc7` upgrades BC2 and BC3 results to BC7.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownFormat`] for unrecognized names.
    pub fn resolve(
        &self,
        name: &str,
        has_alpha: bool,
        force_bc7: bool,
    ) -> Result<BlockFormat, ValidationError> {
        let upper = name.to_ascii_uppercase();
        let mapping = self
            .entries
            .iter()
            .find(|(n, _)| *n == upper)
            .map(|(_, m)| m)
            .ok_or_else(|| ValidationError::UnknownFormat(name.to_string()))?;

        let mut format = match mapping {
            Mapping::Fixed(f) => *f,
            Mapping::AutoByAlpha { opaque, with_alpha } => {
                if has_alpha {
                    *with_alpha
                } else {
                    *opaque
                }
            }
        };

        if force_bc7 && matches!(format, BlockFormat::Bc2 | BlockFormat::Bc3) {
            format = BlockFormat::Bc7;
        }
        Ok(format)
    }
}

impl Default for FormatTable {
    fn default() -> Self {
        Self::standard()
    }
}
