//! CLI argument parsing and output formatting
//!
//! Uses clap for ergonomic CLI argument definitions.

pub mod args;
pub mod output;

pub use args::{Cli, Commands};

use crate::config::{Config, ConfigBuilder};
use crate::error::AppError;
use env_logger::{Builder, Env};
use log::LevelFilter;

/// Merge the config file, environment and command-line flags
pub fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let (library, max_vram) = match &cli.command {
        Commands::Probe(args) => (args.library.clone(), None),
        Commands::Vram(args) => (None, args.max_vram),
        _ => (None, None),
    };

    Ok(ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_env()?
        .with_verbose(cli.verbose.then_some(true))
        .with_library(library)
        .with_max_vram(max_vram)
        .build())
}

/// Logger honouring `RUST_LOG`, raised to debug when `verbose` is set
pub fn logger_builder(verbose: bool) -> Builder {
    logger_builder_from(Env::default().default_filter_or("warn"), verbose)
}

fn logger_builder_from(env: Env<'_>, verbose: bool) -> Builder {
    let mut builder = Builder::from_env(env);
    builder.format_timestamp(None);
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder
}
