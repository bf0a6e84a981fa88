//! Resolution of build settings into concrete encoder parameters.

use crate::encode::format::{BlockFormat, FormatTable};
use crate::error::ValidationError;
use crate::settings::BuildSettings;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Encoder effort level. Raw values follow the SDK convention of 0, 10,
/// 20, 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffortLevel {
    /// Fastest, lowest quality search.
    Low,
    #[default]
    Normal,
    /// Slowest, best quality search.
    High,
}

impl EffortLevel {
    /// Maps a raw effort value; `None` for out-of-range input. Raw 0 is
    /// "use the default".
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 | 20 => Some(EffortLevel::Normal),
            10 => Some(EffortLevel::Low),
            30 => Some(EffortLevel::High),
            _ => None,
        }
    }
}

/// Page-aligned memory layout mode; only meaningful under RDO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TilingMode {
    #[default]
    Disabled,
    Tile256K,
    Tile64K,
}

impl TilingMode {
    /// Maps a raw tiling value; `None` for out-of-range input.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(TilingMode::Disabled),
            1 => Some(TilingMode::Tile256K),
            2 => Some(TilingMode::Tile64K),
            _ => None,
        }
    }
}

/// Concrete parameters handed to the encoder adapter, resolved once per
/// build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub format: BlockFormat,
    /// RDO lambda in [0, 100]; 0 disables RDO.
    pub rdo_lambda: f32,
    pub effort: EffortLevel,
    pub tiling: TilingMode,
    pub debug_color: bool,
}

/// Resolves high-level build settings to encoder parameters.
///
/// Out-of-range effort and tiling values degrade to their defaults with a
/// warning; a non-positive multiplier degrades to 1.0. A lambda of zero
/// disables tiling regardless of the requested mode, and debug-color mode
/// forces lambda 0 with the fastest effort.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownFormat`] if the format name is not
/// in the table.
pub fn resolve_encode_params(
    settings: &BuildSettings,
    has_alpha: bool,
    table: &FormatTable,
) -> Result<EncodeParams, ValidationError> {
    let format = table.resolve(&settings.format_name, has_alpha, settings.force_bc7)?;

    let multiplier = if settings.rdo_multiplier <= 0.0 {
        warn!(
            multiplier = settings.rdo_multiplier,
            "non-positive RDO multiplier, using 1.0"
        );
        1.0
    } else {
        settings.rdo_multiplier
    };
    let mut rdo_lambda = (settings.lossy_compression_amount * multiplier).clamp(0.0, 100.0);

    let mut effort = match EffortLevel::from_raw(settings.effort_raw) {
        Some(effort) => effort,
        None => {
            warn!(raw = settings.effort_raw, "invalid effort level, using Normal");
            EffortLevel::Normal
        }
    };

    let mut tiling = match TilingMode::from_raw(settings.tiling_raw) {
        Some(tiling) => tiling,
        None => {
            warn!(raw = settings.tiling_raw, "invalid tiling mode, using Disabled");
            TilingMode::Disabled
        }
    };

    if settings.debug_color {
        // debug output trades quality for turnaround
        rdo_lambda = 0.0;
        effort = EffortLevel::Low;
    }

    if rdo_lambda == 0.0 {
        // tiling without RDO is meaningless
        tiling = TilingMode::Disabled;
    }

    Ok(EncodeParams {
        format,
        rdo_lambda,
        effort,
        tiling,
        debug_color: settings.debug_color,
    })
}
