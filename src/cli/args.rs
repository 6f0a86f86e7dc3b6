//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// GPU capability probe
///
/// Detect GPU compute runtimes and report device memory and capability.
#[derive(Parser, Debug)]
#[command(name = "gpuprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log every symbol resolution and native status code
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "GPUPROBE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all usable GPUs (or the CPU fallback)
    List,

    /// Initialise a runtime library and report every device
    Probe(ProbeArgs),

    /// Show VRAM available to a workload on the first GPU
    Vram(VramArgs),

    /// List candidate runtime libraries found on this host
    Libs,

    /// Print the environment variable selecting the usable GPUs
    Env,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the probe command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Runtime library to load instead of searching
    #[arg(short, long)]
    pub library: Option<String>,
}

/// Arguments for the vram command
#[derive(Parser, Debug)]
pub struct VramArgs {
    /// Report this many bytes instead of probing
    #[arg(long)]
    pub max_vram: Option<u64>,
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_list() {
        let args = Cli::try_parse_from(["gpuprobe", "list"]).unwrap();
        assert!(matches!(args.command, Commands::List));
    }

    #[test]
    fn test_cli_parse_verbose() {
        let args = Cli::try_parse_from(["gpuprobe", "-v", "list"]).unwrap();
        assert!(args.verbose);
    }

    #[test]
    fn test_cli_parse_probe_library() {
        let args = Cli::try_parse_from([
            "gpuprobe",
            "probe",
            "--library",
            "/usr/local/cuda/lib64/libcudart.so.12",
        ])
        .unwrap();
        if let Commands::Probe(probe) = args.command {
            assert_eq!(
                probe.library.as_deref(),
                Some("/usr/local/cuda/lib64/libcudart.so.12")
            );
        } else {
            panic!("Expected Probe command");
        }
    }

    #[test]
    fn test_cli_parse_format() {
        let args = Cli::try_parse_from(["gpuprobe", "--format", "json", "vram"]).unwrap();
        assert!(matches!(args.format, OutputFormat::Json));
        assert!(matches!(args.command, Commands::Vram(_)));
    }

    #[test]
    fn test_cli_parse_max_vram() {
        let args = Cli::try_parse_from(["gpuprobe", "vram", "--max-vram", "4294967296"]).unwrap();
        if let Commands::Vram(vram) = args.command {
            assert_eq!(vram.max_vram, Some(4294967296));
        } else {
            panic!("Expected Vram command");
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["gpuprobe", "--format", "xml", "list"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
