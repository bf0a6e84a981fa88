//! mipforge CLI - Command-line interface
//!
//! This binary provides a command-line front end to the mipforge library:
//! load a source image, generate a compressed mip chain, and write the
//! raw block data to disk.

mod error;

use clap::{Parser, ValueEnum};
use error::CliError;
use mipforge::builder::TextureBuilder;
use mipforge::image::{GammaSpace, Image, PixelFormat};
use mipforge::logging;
use mipforge::settings::{BuildSettings, MipFilter, PowerOfTwoMode, TextureKind};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, ValueEnum)]
enum MipFilterArg {
    /// Kernel-based downsample (box or sharpened)
    Kernel,
    /// Nearest-sample copy, no filtering
    Unfiltered,
    /// Cosine-lobe angular filtering for HDR cubemaps
    Angular,
    /// Top mip only, no chain
    NoMipmaps,
}

#[derive(Debug, Clone, ValueEnum)]
enum KindArg {
    /// Plain 2D texture
    Texture2d,
    /// Array of independent 2D slices
    Array,
    /// Cubemap (6 slices, or one long-lat slice with angular filtering)
    Cubemap,
    /// Volume texture, slices are depth
    Volume,
}

#[derive(Debug, Clone, ValueEnum)]
enum Pow2Arg {
    /// Leave dimensions untouched
    None,
    /// Pad each dimension up to the next power of two
    Pad,
    /// Pad both dimensions up to the larger next power of two
    PadSquare,
}

#[derive(Parser)]
#[command(name = "mipforge")]
#[command(version = mipforge::VERSION)]
#[command(about = "Build a block-compressed mip chain from a source image", long_about = None)]
struct Args {
    /// Source image path (PNG, JPEG, TGA, ...)
    input: PathBuf,

    /// Output path for the raw compressed mip data
    #[arg(long, short)]
    output: PathBuf,

    /// Target format name (AutoDXT, BC1, BC3, BC5, BC7, ...)
    #[arg(long, default_value = "AutoDXT")]
    format: String,

    /// RDO lambda, 0 disables rate-distortion optimization
    #[arg(long, default_value = "0")]
    lossy: f32,

    /// Mip filter variant
    #[arg(long, value_enum, default_value = "kernel")]
    mip_filter: MipFilterArg,

    /// Texture topology
    #[arg(long, value_enum, default_value = "texture2d")]
    kind: KindArg,

    /// Power-of-two padding mode
    #[arg(long, value_enum, default_value = "none")]
    pow2: Pow2Arg,

    /// Downsample kernel size (2 = box; 4, 6, 8 sharpen)
    #[arg(long, default_value = "2")]
    kernel_size: u32,

    /// Sharpen factor for kernel sizes above 2; negative blurs
    #[arg(long, default_value = "0")]
    sharpen: f32,

    /// Source is linear rather than sRGB-encoded
    #[arg(long)]
    linear: bool,

    /// Invert the green channel (normal map Y convention)
    #[arg(long)]
    flip_green: bool,

    /// Renormalize texels after filtering (tangent-space normal maps)
    #[arg(long)]
    normalize: bool,

    /// Fractional downscale of the top mip, 1 to 8 (no-mipmaps builds)
    #[arg(long, default_value = "1")]
    downscale: f32,

    /// Maximum output resolution; larger sources drop top mips
    #[arg(long, default_value = "0")]
    max_resolution: u32,

    /// Disable parallel dispatch (byte-identical output either way)
    #[arg(long)]
    serial: bool,

    /// Emit per-format debug colors instead of real content
    #[arg(long)]
    debug_color: bool,
}

fn settings_from_args(args: &Args) -> BuildSettings {
    let mut settings = BuildSettings::new(args.format.clone());
    settings.lossy_compression_amount = args.lossy;
    settings.mip_filter = match args.mip_filter {
        MipFilterArg::Kernel => MipFilter::Kernel,
        MipFilterArg::Unfiltered => MipFilter::Unfiltered,
        MipFilterArg::Angular => MipFilter::Angular,
        MipFilterArg::NoMipmaps => MipFilter::NoMipmaps,
    };
    settings.kind = match args.kind {
        KindArg::Texture2d => TextureKind::Texture2D,
        KindArg::Array => TextureKind::Array,
        KindArg::Cubemap => TextureKind::Cubemap,
        KindArg::Volume => TextureKind::Volume,
    };
    settings.pow2_mode = match args.pow2 {
        Pow2Arg::None => PowerOfTwoMode::None,
        Pow2Arg::Pad => PowerOfTwoMode::PadToPowerOfTwo,
        Pow2Arg::PadSquare => PowerOfTwoMode::PadToSquarePowerOfTwo,
    };
    settings.kernel_size = args.kernel_size;
    settings.sharpen = args.sharpen;
    settings.flip_green_channel = args.flip_green;
    settings.renormalize = args.normalize;
    settings.downscale = args.downscale;
    settings.max_texture_resolution = args.max_resolution;
    settings.allow_parallel = !args.serial;
    settings.debug_color = args.debug_color;
    settings
}

/// Load a source image into the pipeline's BGRA8 layout. Float sources
/// keep full precision as linear RGBA32F.
fn load_source(path: &PathBuf, linear: bool) -> Result<Image, CliError> {
    let loaded = image::open(path).map_err(|error| CliError::ImageLoad {
        path: path.display().to_string(),
        error,
    })?;

    let image = match loaded {
        image::DynamicImage::ImageRgba32F(float) => {
            let (width, height) = (float.width() as usize, float.height() as usize);
            let floats = float.into_raw();
            let bytes: Vec<u8> = bytemuck::cast_slice(&floats).to_vec();
            Image::from_raw(
                bytes,
                width,
                height,
                1,
                PixelFormat::Rgba32F,
                GammaSpace::Linear,
            )
        }
        other => {
            let rgba = other.to_rgba8();
            let (width, height) = (rgba.width() as usize, rgba.height() as usize);
            let mut bytes = rgba.into_raw();
            for pixel in bytes.chunks_exact_mut(4) {
                pixel.swap(0, 2); // RGBA -> BGRA
            }
            let gamma = if linear {
                GammaSpace::Linear
            } else {
                GammaSpace::Srgb
            };
            Image::from_raw(bytes, width, height, 1, PixelFormat::Bgra8, gamma)
        }
    };
    image.map_err(|e| CliError::Build(e.into()))
}

fn run(args: &Args) -> Result<(), CliError> {
    let source = load_source(&args.input, args.linear)?;
    println!(
        "Source: {} ({}x{}, {})",
        args.input.display(),
        source.width(),
        source.height(),
        source.format()
    );

    let settings = settings_from_args(args);
    let builder = TextureBuilder::default();
    let output = builder.build(&source, &settings).map_err(CliError::Build)?;

    println!(
        "Built {} mips, format {}, top {}x{}x{}{}",
        output.mips.len(),
        output.format,
        output.top_width,
        output.top_height,
        output.num_slices,
        if output.has_alpha { ", alpha" } else { "" }
    );

    let mut data = Vec::new();
    for (level, mip) in output.mips.iter().enumerate() {
        println!(
            "  mip {:2}: {:4}x{:<4} {:8} bytes",
            level,
            mip.width,
            mip.height,
            mip.data.len()
        );
        data.extend_from_slice(&mip.data);
    }

    fs::write(&args.output, &data).map_err(|error| CliError::FileWrite {
        path: args.output.display().to_string(),
        error,
    })?;
    println!("Wrote {} bytes to {}", data.len(), args.output.display());
    info!(
        output = %args.output.display(),
        bytes = data.len(),
        "build written"
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    let _guard = match logging::init_logging(logging::default_log_dir(), logging::default_log_file())
    {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    if let Err(e) = run(&args) {
        e.exit();
    }
}
