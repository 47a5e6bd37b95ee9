//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sh2ex",
    version,
    about = "Extract virtual file system assets from a disc image"
)]
pub struct Cli {
    /// Disc image (cooked ISO or raw 2352-byte BIN)
    pub image: PathBuf,

    /// Output directory [default: "<image stem> - extracted" next to the image]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print resolved entries instead of extracting them
    #[arg(short, long)]
    pub list: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}
