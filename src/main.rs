//! gpuprobe - GPU capability probe
//!
//! A command-line tool for locating GPU compute runtimes and reporting
//! device memory and compute capability.

use clap::Parser;
use gpuprobe::cli::args::{generate_completions, Cli, Commands};
use gpuprobe::cli::{load_config, logger_builder};
use gpuprobe::commands::{run_env, run_libs, run_list, run_probe, run_vram};
use gpuprobe::config::Config;
use gpuprobe::error::{AppError, ProbeError};

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            logger_builder(cli.verbose).init();
            fail(&e);
        }
    };

    // Initialize logging
    logger_builder(config.general.verbose).init();

    if let Err(e) = run(&cli, &config) {
        fail(&e);
    }
}

fn fail(err: &AppError) -> ! {
    log::error!("{}", err);
    print_error(err);
    std::process::exit(1);
}

fn run(cli: &Cli, config: &Config) -> Result<(), AppError> {
    match &cli.command {
        Commands::List => run_list(config, cli.format),

        Commands::Probe(_) => run_probe(config, cli.format),

        Commands::Vram(_) => run_vram(config, cli.format),

        Commands::Libs => run_libs(config, cli.format),

        Commands::Env => run_env(config, cli.format),

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::NoRuntimeLibrary => {
            eprintln!();
            eprintln!("Hint: Make sure the CUDA runtime (libcudart) is installed.");
            eprintln!("      Use --library or LD_LIBRARY_PATH to point at a custom location.");
        }
        AppError::Probe(ProbeError::DriverInsufficient) => {
            eprintln!();
            eprintln!("Hint: The GPU driver is older than the runtime library requires.");
            eprintln!("      Update the NVIDIA driver or use an older runtime.");
        }
        AppError::NoGpusFound => {
            eprintln!();
            eprintln!("Hint: Run 'gpuprobe probe -v' to see why each device was rejected.");
        }
        _ => {}
    }
}
