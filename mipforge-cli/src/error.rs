//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use mipforge::error::{TextureError, ValidationError};
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to load the source image
    ImageLoad {
        path: String,
        error: image::ImageError,
    },
    /// The texture build failed
    Build(TextureError),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Build(TextureError::Validation(ValidationError::UnknownFormat(_))) => {
                eprintln!();
                eprintln!("Known format names:");
                eprintln!("  AutoDXT, DXT1/BC1, DXT3/BC2, DXT5/BC3, BC4, BC5, BC6H, BC7");
            }
            CliError::Build(TextureError::Validation(
                ValidationError::CubemapSliceCount { .. },
            )) => {
                eprintln!();
                eprintln!("Cubemap sources need 6 slices (or one long-lat slice with");
                eprintln!("--mip-filter angular); cubemap arrays need a multiple of 6.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::ImageLoad { path, error } => {
                write!(f, "Failed to load image '{}': {}", path, error)
            }
            CliError::Build(error) => write!(f, "Texture build failed: {}", error),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {}
