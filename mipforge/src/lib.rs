//! mipforge - Deterministic texture build pipeline
//!
//! This library turns a source image into a block-compressed mip chain:
//! mip generation (kernel, sharpened, angular cubemap and volume
//! filtering, alpha-coverage preservation) followed by BCn encoding
//! under optional rate-distortion optimization, with byte-identical
//! output regardless of thread count.
//!
//! # High-Level API
//!
//! Most callers go through the [`builder`] module:
//!
//! ```
//! use mipforge::builder::TextureBuilder;
//! use mipforge::image::{GammaSpace, Image, PixelFormat};
//! use mipforge::settings::BuildSettings;
//!
//! let source = Image::from_raw(
//!     vec![0u8; 16 * 16 * 4],
//!     16,
//!     16,
//!     1,
//!     PixelFormat::Bgra8,
//!     GammaSpace::Srgb,
//! )?;
//! let output = TextureBuilder::default().build(&source, &BuildSettings::new("AutoDXT"))?;
//! assert_eq!(output.mips.len(), 5);
//! # Ok::<(), mipforge::error::TextureError>(())
//! ```

pub mod builder;
pub mod color;
pub mod encode;
pub mod error;
pub mod image;
pub mod logging;
pub mod mipgen;
pub mod settings;

pub use builder::{BuildOutput, TextureBuilder};
pub use color::LinearColor;
pub use error::TextureError;

/// Version of the mipforge library and CLI.
///
/// Synchronized across all components in the workspace; defined in
/// `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
