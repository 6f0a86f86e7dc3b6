//! Env command implementation
//!
//! Prints the variable that pins a child process to the usable GPUs.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, EnvReport};
use crate::config::Config;
use crate::error::Result;
use crate::services::InventoryService;

/// Execute the env command
pub fn run_env(config: &Config, format: OutputFormat) -> Result<()> {
    let gpus = InventoryService::new(config).gpu_info()?;
    let (variable, value) = match gpus.visible_devices_env() {
        Some((var, value)) => (Some(var.to_string()), Some(value)),
        None => (None, None),
    };
    print_output(&EnvReport { variable, value }, format)?;
    Ok(())
}
