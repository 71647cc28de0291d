//! assetpipe - rebuild stale assets when the browser asks for them.

mod asset;
mod cli;
mod config;
mod core;
mod events;
mod handler;
mod logger;
mod strategy;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, common::Pipeline};
use config::PipelineConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = PipelineConfig::load(&cli)?;
    let pipeline = Pipeline::from_config(&config)?;
    let observer = events::log_observer();

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(&config, &pipeline, &observer),
        Commands::Build => cli::build::run_build(&pipeline, &observer),
        Commands::Status => cli::build::run_status(&pipeline),
    }
}
