//! Maskpack: polygon annotations to packed segmentation tensors.
//!
//! Maskpack reads LabelMe-style polygon annotations, rasterizes them into
//! per-pixel class masks, splits the samples into train and validation
//! sets, and packs images and masks into flat fixed-shape `uint8` buffers
//! with an `info.json` and a zip archive next to them.
//!
//! # Modules
//!
//! - [`labels`]: Label spellings to canonical classes
//! - [`annotation`]: LabelMe annotation model and reader
//! - [`discover`], [`resolve`], [`pairs`]: Finding (annotation, image) pairs
//! - [`raster`]: Polygon rasterization and mask compositing
//! - [`split`]: Seeded train/validation split
//! - [`pack`]: Binary buffers, metadata and PNG export
//! - [`archive`]: Zip output
//! - [`build`]: The end-to-end pipeline
//! - [`verify`]: Consistency checks for a packed directory
//! - [`error`]: Error types for maskpack operations

pub mod annotation;
pub mod archive;
pub mod build;
pub mod config;
pub mod discover;
pub mod error;
pub mod labels;
pub mod pack;
pub mod pairs;
pub mod raster;
pub mod report;
pub mod resolve;
pub mod split;
pub mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

pub use build::{run_build, BuildOptions};
pub use error::MaskpackError;
pub use report::BuildReport;
pub use verify::{verify_output, VerifyReport};

/// The maskpack CLI application.
#[derive(Parser)]
#[command(name = "maskpack")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build packed train/val buffers from annotated images.
    Build(BuildArgs),
    /// Check a packed output directory against its info.json.
    Verify(VerifyArgs),
}

/// Arguments for the build subcommand.
#[derive(clap::Args)]
struct BuildArgs {
    /// Directories searched recursively for annotation JSON files.
    #[arg(long, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Output directory [default: out].
    #[arg(long, env = "MASKPACK_OUT")]
    out: Option<PathBuf>,

    /// Number of samples held out for validation [default: 8].
    #[arg(long)]
    val_count: Option<usize>,

    /// Seed for the train/validation shuffle [default: 1337].
    #[arg(long, env = "MASKPACK_SEED")]
    seed: Option<u64>,

    /// Class that keeps overlapping head/hand pixels [default: head].
    #[arg(long, value_enum)]
    priority: Option<PriorityArg>,

    /// Mask classes to build [default: three-class].
    #[arg(long, value_enum)]
    scheme: Option<SchemeArg>,

    /// Edge length of the packed square samples [default: 768].
    #[arg(long)]
    size: Option<u32>,

    /// Interpolation used when resizing square images [default: bicubic].
    #[arg(long, value_enum)]
    resize_filter: Option<FilterArg>,

    /// Archive file name inside the output directory [default: dataset.zip].
    #[arg(long, conflicts_with = "no_archive")]
    archive_name: Option<String>,

    /// Do not write the zip archive.
    #[arg(long)]
    no_archive: bool,

    /// Also write every packed sample as PNG image and colored mask.
    #[arg(long)]
    export_png: bool,

    /// List the planned samples without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// YAML config file with defaults for the options above.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the verify subcommand.
#[derive(clap::Args)]
struct VerifyArgs {
    /// Output directory written by `build`.
    dir: PathBuf,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PriorityArg {
    Head,
    Hand,
}

impl From<PriorityArg> for raster::OverlapPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Head => raster::OverlapPriority::Head,
            PriorityArg::Hand => raster::OverlapPriority::Hand,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemeArg {
    ThreeClass,
    Binary,
}

impl From<SchemeArg> for labels::MaskScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::ThreeClass => labels::MaskScheme::ThreeClass,
            SchemeArg::Binary => labels::MaskScheme::Binary,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterArg {
    Nearest,
    Bilinear,
    Bicubic,
}

impl From<FilterArg> for pack::ResizeFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Nearest => pack::ResizeFilter::Nearest,
            FilterArg::Bilinear => pack::ResizeFilter::Bilinear,
            FilterArg::Bicubic => pack::ResizeFilter::Bicubic,
        }
    }
}

/// Run the maskpack CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), MaskpackError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Build(args)) => run_build_command(args),
        Some(Commands::Verify(args)) => run_verify_command(args),
        None => {
            println!("maskpack {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Packs polygon annotations into image/mask training tensors.");
            println!();
            println!("Run 'maskpack --help' for usage information.");
            Ok(())
        }
    }
}

/// Merge defaults, the config file and command-line flags, in that order.
fn build_options(args: &BuildArgs) -> Result<BuildOptions, MaskpackError> {
    let mut options = BuildOptions::default();
    if let Some(path) = &args.config {
        options = options.with_config(config::FileConfig::read(path)?);
    }

    if !args.inputs.is_empty() {
        options.inputs = args.inputs.clone();
    }
    if let Some(out) = &args.out {
        options.out = out.clone();
    }
    if let Some(val_count) = args.val_count {
        options.val_count = val_count;
    }
    if let Some(seed) = args.seed {
        options.seed = seed;
    }
    if let Some(priority) = args.priority {
        options.priority = priority.into();
    }
    if let Some(scheme) = args.scheme {
        options.scheme = scheme.into();
    }
    if let Some(size) = args.size {
        options.size = size;
    }
    if let Some(filter) = args.resize_filter {
        options.resize_filter = filter.into();
    }
    if let Some(name) = &args.archive_name {
        options.archive_name = Some(name.clone());
    }
    if args.no_archive {
        options.archive_name = None;
    }
    options.export_png = args.export_png;
    options.dry_run = args.dry_run;

    Ok(options)
}

/// Execute the build subcommand.
fn run_build_command(args: BuildArgs) -> Result<(), MaskpackError> {
    let options = build_options(&args)?;
    let mut report = BuildReport::new(options.dry_run);

    // The report is printed even when the build fails, so skips stay visible.
    let result = run_build(&options, &mut report);
    emit(&report, args.output)?;
    result
}

/// Execute the verify subcommand.
fn run_verify_command(args: VerifyArgs) -> Result<(), MaskpackError> {
    let report = verify_output(&args.dir)?;
    emit(&report, args.output)?;

    if report.is_ok() {
        Ok(())
    } else {
        Err(MaskpackError::VerifyFailed {
            problem_count: report.problems.len(),
            report,
        })
    }
}

fn emit<R: Serialize + std::fmt::Display>(
    report: &R,
    format: OutputFormat,
) -> Result<(), MaskpackError> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|err| MaskpackError::Io(err.into()))?;
            println!("{json}");
        }
        OutputFormat::Text => println!("{report}"),
    }
    Ok(())
}
