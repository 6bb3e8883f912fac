//! Main entry point for the vmap extractor

mod cli;
mod progress;

use anyhow::{Context, Result};
use clap::Parser;
use vmap_extractor::Pipeline;
use vmap_extractor::storage::LooseStorageProvider;

use crate::cli::Cli;
use crate::progress::ProgressReporter;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Set verbosity
    if cli.verbose > 0 {
        log::set_max_level(match cli.verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    } else if cli.quiet {
        log::set_max_level(log::LevelFilter::Error);
    }

    let config = cli.config();
    let provider = LooseStorageProvider::new(&config.data_dir);
    let mut pipeline = Pipeline::open(config, &provider).with_context(|| {
        format!("Failed to prepare extraction from {}", cli.data.display())
    })?;

    println!(
        "Extracting from build {} ({}) into {}",
        pipeline.build(),
        pipeline.locale(),
        pipeline.config().output_dir.display()
    );

    let mut progress = ProgressReporter::new(cli.quiet);
    let stats = pipeline
        .run(&mut progress)
        .context("Extraction aborted")?;

    println!(
        "Done: {} maps, {} tiles ({} inherited), {} placements, {} objects, {} game object models",
        stats.maps,
        stats.tiles,
        stats.parent_tiles,
        stats.placements,
        pipeline.object_count(),
        pipeline.gameobject_model_count()
    );
    Ok(())
}
