//! Command line of the vmap extractor

use clap::Parser;
use std::path::PathBuf;
use vmap_extractor::ExtractorConfig;
use vmap_extractor::config::DEFAULT_OUTPUT_DIR;

#[derive(Parser)]
#[command(name = "vmap-extractor")]
#[command(about = "Extract building collision data and object placements from a World of Warcraft client", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Client root directory (holds Data/ and .build.info)
    #[arg(short, long, env = "VMAP_DATA_DIR", default_value = ".")]
    pub data: PathBuf,

    /// Output directory for buildings and placement files
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Keep full building geometry instead of the collision mesh
    #[arg(short, long, conflicts_with = "small")]
    pub large: bool,

    /// Keep only the collision mesh of buildings (default)
    #[arg(short, long)]
    pub small: bool,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn config(&self) -> ExtractorConfig {
        ExtractorConfig::new(&self.data, &self.output, self.large)
    }
}
